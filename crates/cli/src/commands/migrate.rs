//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! al-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `AQUALEDGER_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Migrations live in `crates/server/migrations/` and are embedded in the
//! server crate, so the binary carries them.

use aqualedger_server::db::MIGRATOR;

use super::{CliError, connect};

/// Apply all pending migrations.
pub async fn run() -> Result<(), CliError> {
    let (_, pool) = connect().await?;

    tracing::info!("Running migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
