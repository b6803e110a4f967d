//! HTTP middleware.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (`x-request-id` on span, Sentry scope and response)
//! 4. Security headers
//! 5. CORS (when an origin is configured)
//! 6. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is enforced per handler by the extractors in [`auth`].

pub mod auth;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
