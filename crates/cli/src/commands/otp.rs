//! One-time code maintenance.

use aqualedger_server::db::OtpRepository;

use super::{CliError, connect};

/// Delete every expired login code now instead of waiting for the server's
/// sweeper.
pub async fn purge() -> Result<(), CliError> {
    let (_, pool) = connect().await?;

    let removed = OtpRepository::new(&pool).purge_expired().await?;

    tracing::info!(removed, "Expired login codes purged");
    Ok(())
}
