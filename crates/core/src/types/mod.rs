//! Core types for Aqualedger.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod calendar;
pub mod email;
pub mod id;
pub mod status;
pub mod tenant;

pub use calendar::{YearMonth, YearMonthError};
pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
pub use tenant::BusinessId;
