//! HTTP middleware for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authorization is an extractor ([`RequireAdmin`]) on each protected handler
//! rather than a layer, so health checks stay open.

pub mod auth;
pub mod session;

pub use auth::{AdminRejection, RequireAdmin, set_current_user};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
