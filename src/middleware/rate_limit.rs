//! Rate limiting middleware using actix-governor.
//!
//! Inbound requests are limited per peer IP.

use actix_governor::governor::middleware::NoOpMiddleware;
use actix_governor::{Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor};

/// Type alias for the rate limiter configuration.
pub type RateLimiterConfig = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Type alias for the rate limiter.
pub type RateLimiter = Governor<PeerIpKeyExtractor, NoOpMiddleware>;

/// Seconds between replenished requests
const SECONDS_PER_REQUEST: u64 = 2;

/// Requests allowed in a burst
const BURST_SIZE: u32 = 30;

/// Creates the per-IP rate limiter: bursts of 30, refilled one request
/// every 2 seconds.
///
/// Returns `None` if the governor rejects the configuration.
///
/// # Example
///
/// ```ignore
/// HttpServer::new(move || {
///     let mut app = App::new();
///     if let Some(limiter) = create_rate_limiter() {
///         app = app.wrap(limiter);
///     }
///     app
/// })
/// ```
pub fn create_rate_limiter() -> Option<RateLimiter> {
    let config: RateLimiterConfig = GovernorConfigBuilder::default()
        .seconds_per_request(SECONDS_PER_REQUEST)
        .burst_size(BURST_SIZE)
        .finish()?;

    Some(Governor::new(&config))
}
