//! Middleware for the cloudprov-api application.
//!
//! This module contains:
//! - `auth` - JWT authentication (AuthenticatedTeam extractor)
//! - `rate_limit` - Rate limiting middleware using Governor

pub mod auth;
pub mod rate_limit;

// Re-export commonly used types
pub use auth::{AuthError, AuthenticatedTeam};
pub use rate_limit::{create_rate_limiter, RateLimiter, RateLimiterConfig};
