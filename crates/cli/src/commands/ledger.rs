//! Ledger maintenance commands.
//!
//! # Usage
//!
//! ```bash
//! # Report customers whose stored totals disagree with their deliveries
//! al-cli ledger reconcile --dry-run
//!
//! # Repair them
//! al-cli ledger reconcile --business default-business
//! ```

use aqualedger_server::services::LedgerService;

use super::{CliError, business_or_default, connect};

/// Recompute customer totals from deliveries and print what drifted.
pub async fn reconcile(business: Option<String>, dry_run: bool) -> Result<(), CliError> {
    let (config, pool) = connect().await?;
    let business = business_or_default(business, &config);

    let drifted = LedgerService::new(&pool, config.calendar)
        .reconcile(&business, dry_run)
        .await?;

    #[allow(clippy::print_stdout)]
    for outcome in &drifted {
        println!(
            "{:<6} {:<24} billed {} -> {}  paid {} -> {}",
            outcome.customer_id,
            outcome.customer_name,
            outcome.stored.total_billed,
            outcome.recomputed.total_billed,
            outcome.stored.total_paid,
            outcome.recomputed.total_paid,
        );
    }

    if drifted.is_empty() {
        tracing::info!(business = %business, "All customer totals match their deliveries");
    } else if dry_run {
        tracing::warn!(count = drifted.len(), "Drifted customers found (dry run, nothing written)");
    } else {
        tracing::info!(count = drifted.len(), "Drifted customers repaired");
    }
    Ok(())
}
