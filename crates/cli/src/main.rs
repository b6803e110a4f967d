//! Aqualedger CLI - database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! al-cli migrate
//!
//! # Create a user
//! al-cli user create -e admin@example.com -n "Admin Name" -r admin
//!
//! # Seed demo data
//! al-cli seed --days 7
//!
//! # Check customer totals against deliveries
//! al-cli ledger reconcile --dry-run
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user` - Create, list, activate and deactivate users
//! - `seed` - Seed a business with demo customers, deliveries and bulk orders
//! - `ledger reconcile` - Recompute customer totals from deliveries
//! - `otp purge` - Delete expired login codes

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "al-cli")]
#[command(author, version, about = "Aqualedger CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Seed demo data
    Seed {
        /// Days of delivery history to mark
        #[arg(short, long, default_value_t = 7)]
        days: u32,

        /// Business to seed (defaults to `DEFAULT_BUSINESS_ID`)
        #[arg(short, long)]
        business: Option<String>,
    },
    /// Ledger maintenance
    Ledger {
        #[command(subcommand)]
        action: LedgerAction,
    },
    /// Login code maintenance
    Otp {
        #[command(subcommand)]
        action: OtpAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Phone number
        #[arg(short, long)]
        phone: Option<String>,

        /// Role (`admin`, `worker`)
        #[arg(short, long, default_value = "worker")]
        role: String,

        /// Business the user works for (defaults to `DEFAULT_BUSINESS_ID`)
        #[arg(short, long)]
        business: Option<String>,
    },
    /// List users of a business
    List {
        /// Business to list (defaults to `DEFAULT_BUSINESS_ID`)
        #[arg(short, long)]
        business: Option<String>,
    },
    /// Allow a user to sign in again
    Activate {
        /// Email address
        #[arg(short, long)]
        email: String,
    },
    /// Block a user from signing in
    Deactivate {
        /// Email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum LedgerAction {
    /// Recompute customer totals from their deliveries
    Reconcile {
        /// Business to check (defaults to `DEFAULT_BUSINESS_ID`)
        #[arg(short, long)]
        business: Option<String>,

        /// Report drift without writing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum OtpAction {
    /// Delete expired login codes
    Purge,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                phone,
                role,
                business,
            } => {
                commands::user::create(&email, &name, phone.as_deref(), &role, business).await?;
            }
            UserAction::List { business } => commands::user::list(business).await?,
            UserAction::Activate { email } => commands::user::set_active(&email, true).await?,
            UserAction::Deactivate { email } => commands::user::set_active(&email, false).await?,
        },
        Commands::Seed { days, business } => commands::seed::run(days, business).await?,
        Commands::Ledger { action } => match action {
            LedgerAction::Reconcile { business, dry_run } => {
                commands::ledger::reconcile(business, dry_run).await?;
            }
        },
        Commands::Otp { action } => match action {
            OtpAction::Purge => commands::otp::purge().await?,
        },
    }
    Ok(())
}
