//! Cross-cutting request handling layered onto the router: request guards,
//! rate limiting, caller role resolution, request origin and response headers.

pub mod auth;
pub mod origin;
pub mod rate_limit;
pub mod security_headers;
pub mod validation;

pub use auth::{Caller, Role};
pub use rate_limit::{EndpointRateLimiter, RateLimiter};
pub use validation::Validate;
