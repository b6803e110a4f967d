//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create a user directly (they sign in with an emailed code)
//! al-cli user create -e owner@example.com -n "Owner" -r admin
//!
//! # List the users of a business
//! al-cli user list --business default-business
//!
//! # Block or restore sign-in
//! al-cli user deactivate -e worker@example.com
//! al-cli user activate -e worker@example.com
//! ```

use aqualedger_core::{Email, UserRole};
use aqualedger_server::db::UserRepository;
use aqualedger_server::db::users::NewUser;

use super::{CliError, business_or_default, connect};

/// Create a user with an explicit role.
pub async fn create(
    email: &str,
    name: &str,
    phone: Option<&str>,
    role: &str,
    business: Option<String>,
) -> Result<(), CliError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| CliError::Invalid(format!("Invalid role: {role}. Valid roles: admin, worker")))?;
    let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;

    let (config, pool) = connect().await?;
    let business = business_or_default(business, &config);

    let user = UserRepository::new(&pool)
        .create_with_role(
            &NewUser {
                email: &email,
                name,
                phone,
                business_id: &business,
            },
            role,
        )
        .await?;

    tracing::info!(
        id = %user.id,
        email = %user.email,
        role = %user.role,
        business = %user.business_id,
        "User created"
    );
    Ok(())
}

/// Print the users of a business.
pub async fn list(business: Option<String>) -> Result<(), CliError> {
    let (config, pool) = connect().await?;
    let business = business_or_default(business, &config);

    let users = UserRepository::new(&pool).list(&business).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{:<6} {:<32} {:<24} {:<8} {}", "ID", "EMAIL", "NAME", "ROLE", "ACTIVE");
        for user in &users {
            println!(
                "{:<6} {:<32} {:<24} {:<8} {}",
                user.id,
                user.email,
                user.name,
                user.role,
                if user.is_active { "yes" } else { "no" }
            );
        }
    }

    tracing::info!(count = users.len(), business = %business, "Listed users");
    Ok(())
}

/// Enable or disable sign-in for a user.
pub async fn set_active(email: &str, is_active: bool) -> Result<(), CliError> {
    let email = Email::parse(email).map_err(|e| CliError::Invalid(e.to_string()))?;
    let (_, pool) = connect().await?;

    let users = UserRepository::new(&pool);
    let user = users
        .get_by_email(&email)
        .await?
        .ok_or_else(|| CliError::Invalid(format!("No user with email {email}")))?;

    users.set_active(user.id, is_active).await?;

    tracing::info!(email = %email, is_active, "User updated");
    Ok(())
}
