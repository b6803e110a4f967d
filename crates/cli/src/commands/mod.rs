//! Subcommand implementations.
//!
//! Every command loads the server configuration (so `.env` and the
//! `AQUALEDGER_*` variables apply) and talks to the database through the
//! server's repositories and services.

pub mod ledger;
pub mod migrate;
pub mod otp;
pub mod seed;
pub mod user;

use sqlx::PgPool;
use thiserror::Error;

use aqualedger_core::BusinessId;
use aqualedger_server::config::{ConfigError, ServerConfig};
use aqualedger_server::db::{self, RepositoryError};
use aqualedger_server::services::ServiceError;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Invalid(String),
}

/// Load configuration and open a pool.
pub async fn connect() -> Result<(ServerConfig, PgPool), CliError> {
    let config = ServerConfig::from_env()?;
    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    Ok((config, pool))
}

/// The business a command acts on: the `--business` flag or the configured
/// default.
fn business_or_default(business: Option<String>, config: &ServerConfig) -> BusinessId {
    business.map_or_else(|| config.default_business.clone(), BusinessId::new)
}
