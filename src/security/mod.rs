//! Security Module
//!
//! Request throttling keyed by network origin and action.

pub mod rate_limit;

pub use rate_limit::RateLimiter;
