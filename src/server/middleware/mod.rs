//! Request middleware mounted in front of the `/api` routes

pub mod cache;
pub mod rate_limit;

pub use cache::{ResponseCache, cache_responses};
pub use rate_limit::{
    FixedWindowLimiter, RateLimiters, client_key, limit_creates, limit_logins, limit_requests,
};
