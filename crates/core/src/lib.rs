//! Aqualedger Core - Shared domain types and ledger arithmetic.
//!
//! This crate provides the types used across all Aqualedger components:
//! - `server` - HTTP API for customers, deliveries, bulk orders and reports
//! - `cli` - Command-line tools for migrations, seeding and reconciliation
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Every derived ledger figure (pending balances, bulk order
//! totals, payment status) is computed here so the persistence layer applies
//! it as an explicit step before writing.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, tenants, calendar months and status enums
//! - [`ledger`] - Derivations for customer balances and bulk order amounts

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod ledger;
pub mod types;

pub use ledger::*;
pub use types::*;
