//! HTTP middleware and request extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Rate limiting on the auth routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{Client, OptionalAuth, RequireAuth};
pub use rate_limit::{auth_rate_limiter, client_ip};
pub use request_id::request_id_middleware;
