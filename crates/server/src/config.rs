//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `AQUALEDGER_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `AQUALEDGER_HOST` - Bind address (default: 127.0.0.1)
//! - `AQUALEDGER_PORT` - Listen port (default: 5000)
//! - `AQUALEDGER_BASE_URL` - Public URL, decides whether cookies are `Secure`
//!   (default: `http://localhost:5000`)
//! - `APP_ENV` - `development` or `production` (default: development)
//! - `DEFAULT_BUSINESS_ID` - Tenant assigned to new users (default: `default-business`)
//! - `BUSINESS_UTC_OFFSET` - Offset of the business's calendar day, `±HH:MM` (default: +00:00)
//! - `OTP_EXPIRE_MINUTES` - Login code lifetime (default: 10)
//! - `SESSION_EXPIRY_DAYS` - Session inactivity expiry (default: 7)
//! - `CORS_ALLOWED_ORIGIN` - Origin of the single-page UI, enables CORS
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN`, `SENTRY_ENVIRONMENT`, `SENTRY_SAMPLE_RATE`, `SENTRY_TRACES_SAMPLE_RATE`
//!
//! ## Optional (SMTP - all or none; without it login codes are logged)
//! - `SMTP_HOST`, `SMTP_USERNAME`, `SMTP_PASSWORD`, `SMTP_FROM`
//! - `SMTP_PORT` (default: 587)
//!
//! ## Optional (TLS)
//! - `AQUALEDGER_TLS_CERT` - PEM-encoded certificate chain
//! - `AQUALEDGER_TLS_KEY` - PEM-encoded private key

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use aqualedger_core::BusinessId;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;
const DEFAULT_OTP_EXPIRE_MINUTES: i64 = 10;
const DEFAULT_SESSION_EXPIRY_DAYS: i64 = 7;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Login codes are echoed in API responses.
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected development or production, got {other}")),
        }
    }
}

/// The business's notion of "today".
///
/// Deliveries are keyed by calendar day. The day boundary is midnight at a
/// fixed UTC offset so that every server instance agrees on which day a
/// timestamp belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessCalendar {
    offset: FixedOffset,
}

impl BusinessCalendar {
    #[must_use]
    pub const fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    #[must_use]
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Calendar day `instant` falls on.
    #[must_use]
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Today's calendar day.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    /// The instant local midnight begins `date`.
    #[must_use]
    pub fn start_of(&self, date: NaiveDate) -> DateTime<Utc> {
        let local = date.and_time(chrono::NaiveTime::MIN);
        (local - self.offset).and_utc()
    }

    /// Parse an offset like `+05:30`, `-04:00` or `Z`.
    ///
    /// # Errors
    ///
    /// Returns a message describing the expected format.
    pub fn parse_offset(s: &str) -> Result<FixedOffset, String> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
            return Ok(Utc.fix());
        }
        let (sign, rest) = match s.split_at_checked(1) {
            Some(("+", rest)) => (1, rest),
            Some(("-", rest)) => (-1, rest),
            _ => return Err(format!("expected ±HH:MM, got {s}")),
        };
        let (hours, minutes) = rest
            .split_once(':')
            .ok_or_else(|| format!("expected ±HH:MM, got {s}"))?;
        let hours: i32 = hours.parse().map_err(|_| format!("invalid hours in {s}"))?;
        let minutes: i32 = minutes
            .parse()
            .map_err(|_| format!("invalid minutes in {s}"))?;
        if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
            return Err(format!("offset out of range: {s}"));
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .ok_or_else(|| format!("offset out of range: {s}"))
    }
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API
    pub base_url: String,
    /// Deployment environment
    pub environment: Environment,
    /// Tenant assigned to newly created users
    pub default_business: BusinessId,
    /// Calendar used to normalize delivery dates
    pub calendar: BusinessCalendar,
    /// Lifetime of a login code, in minutes
    pub otp_expire_minutes: i64,
    /// Session inactivity expiry, in days
    pub session_expiry_days: i64,
    /// Origin allowed to call the API from a browser
    pub cors_allowed_origin: Option<String>,
    /// Emit JSON logs instead of text
    pub json_logs: bool,
    /// Email configuration (optional - codes are logged without it)
    pub email: Option<EmailConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Email (SMTP) configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP server hostname
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP authentication username
    pub smtp_username: String,
    /// SMTP authentication password
    pub smtp_password: SecretString,
    /// Email sender address (From header)
    pub from_address: String,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl EmailConfig {
    /// Load SMTP settings. All four required variables are set together or
    /// not at all.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let host = get_optional_env("SMTP_HOST");
        let username = get_optional_env("SMTP_USERNAME");
        let password = get_optional_env("SMTP_PASSWORD");
        let from = get_optional_env("SMTP_FROM");

        match (host, username, password, from) {
            (Some(smtp_host), Some(smtp_username), Some(password), Some(from_address)) => {
                let smtp_port = parse_env("SMTP_PORT", "587")?;
                if let Err(e) = validate_secret_strength(&password, "SMTP_PASSWORD") {
                    tracing::warn!("SMTP_PASSWORD validation warning: {e}");
                }
                Ok(Some(Self {
                    smtp_host,
                    smtp_port,
                    smtp_username,
                    smtp_password: SecretString::from(password),
                    from_address,
                }))
            }
            (None, None, None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SMTP_*".to_string(),
                "SMTP_HOST, SMTP_USERNAME, SMTP_PASSWORD and SMTP_FROM must be set together"
                    .to_string(),
            )),
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("AQUALEDGER_TLS_CERT");
        let key_pem = get_optional_env("AQUALEDGER_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "AQUALEDGER_TLS_*".to_string(),
                "Both AQUALEDGER_TLS_CERT and AQUALEDGER_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or any value
    /// fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("AQUALEDGER_DATABASE_URL")?;
        let host = parse_env("AQUALEDGER_HOST", "127.0.0.1")?;
        let port = parse_env("AQUALEDGER_PORT", "5000")?;
        let base_url = get_env_or_default("AQUALEDGER_BASE_URL", "http://localhost:5000");
        let environment = parse_env("APP_ENV", "development")?;
        let default_business =
            BusinessId::new(get_env_or_default("DEFAULT_BUSINESS_ID", BusinessId::DEFAULT));
        let offset = BusinessCalendar::parse_offset(&get_env_or_default(
            "BUSINESS_UTC_OFFSET",
            "+00:00",
        ))
        .map_err(|e| ConfigError::InvalidEnvVar("BUSINESS_UTC_OFFSET".to_string(), e))?;
        let otp_expire_minutes = parse_positive(
            "OTP_EXPIRE_MINUTES",
            DEFAULT_OTP_EXPIRE_MINUTES,
        )?;
        let session_expiry_days = parse_positive(
            "SESSION_EXPIRY_DAYS",
            DEFAULT_SESSION_EXPIRY_DAYS,
        )?;
        let cors_allowed_origin = get_optional_env("CORS_ALLOWED_ORIGIN");
        let json_logs = get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json"));
        let email = EmailConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.1);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            default_business,
            calendar: BusinessCalendar::new(offset),
            otp_expire_minutes,
            session_expiry_days,
            cors_allowed_origin,
            json_logs,
            email,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Returns a reference to the email configuration, if available.
    #[must_use]
    pub const fn email(&self) -> Option<&EmailConfig> {
        self.email.as_ref()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_positive(key: &str, default: i64) -> Result<i64, ConfigError> {
    let value: i64 = parse_env(key, &default.to_string())?;
    if value < 1 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be at least 1".to_string(),
        ));
    }
    Ok(value)
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholder-looking or low-entropy secrets.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
