//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{BusinessCalendar, ServerConfig};
use crate::services::{AuthService, EmailService, LedgerService, ReportService};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Services borrow the pool and
/// are built per request through the accessors below.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    pool: PgPool,
    email: Option<EmailService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// A broken SMTP configuration is logged and login codes fall back to
    /// the log, so the API still starts.
    #[must_use]
    pub fn new(config: ServerConfig, pool: PgPool) -> Self {
        let email = config.email().and_then(|email_config| {
            EmailService::new(email_config)
                .inspect_err(|e| tracing::warn!(error = %e, "Email service unavailable"))
                .ok()
        });

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get the email service, if SMTP is configured.
    #[must_use]
    pub fn email(&self) -> Option<&EmailService> {
        self.inner.email.as_ref()
    }

    #[must_use]
    pub fn calendar(&self) -> BusinessCalendar {
        self.inner.config.calendar
    }

    #[must_use]
    pub fn ledger(&self) -> LedgerService<'_> {
        LedgerService::new(self.pool(), self.calendar())
    }

    #[must_use]
    pub fn reports(&self) -> ReportService<'_> {
        ReportService::new(self.pool(), self.calendar())
    }

    #[must_use]
    pub fn auth(&self) -> AuthService<'_> {
        let config = self.config();
        AuthService::new(
            self.pool(),
            self.email(),
            config.otp_expire_minutes,
            &config.default_business,
        )
    }
}
