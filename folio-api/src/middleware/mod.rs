//! Middleware for the FOLIO API
//!
//! - `auth`: bearer JWT authentication and the `AuthExtractor`
//! - `rate_limit`: per-client-IP request quotas
//!
//! # Middleware Order
//!
//! ```ignore
//! Router::new()
//!     .route("/api/pages/:id/", get(handler))
//!     // Innermost: resolves the caller for handlers
//!     .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
//!     // Rate limiting runs before auth so floods never reach JWT validation
//!     .layer(middleware::from_fn_with_state(rate_limit_state, rate_limit_middleware))
//!     // Outermost
//! ```

mod auth;
mod rate_limit;

pub use auth::{auth_middleware, AuthExtractor, AuthMiddlewareError, AuthMiddlewareState};
pub use rate_limit::{rate_limit_middleware, RateLimitError, RateLimitState};
