//! Rate Limiting Module
//!
//! Fixed-window counters shared through the store, so every process behind the
//! same Redis sees the same windows. The window starts at the first request for
//! a key and is not extended by later ones.
//!
//! The limiter fails open: when the store cannot be reached the request is
//! allowed and a warning is logged.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::config::{RateLimitRule, RateLimitSettings};
use crate::error::Result;
use crate::models::{RateLimitDecision, RateLimitInfo, RateLimitKey};
use crate::observability::TallyMetrics;
use crate::storage::repository::RateLimitRepository;

/// Store-backed fixed-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    /// Counter storage
    repository: Arc<dyn RateLimitRepository>,
    /// Time source for reset estimates
    clock: Arc<dyn Clock>,
    /// Whether rate limiting is enabled
    enabled: bool,
    metrics: Option<TallyMetrics>,
}

impl RateLimiter {
    /// Create new rate limiter
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self {
            repository,
            clock: Arc::new(SystemClock),
            enabled: true,
            metrics: None,
        }
    }

    /// Create from settings
    pub fn from_settings(repository: Arc<dyn RateLimitRepository>, settings: &RateLimitSettings) -> Self {
        Self::new(repository).enabled(settings.enabled)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: TallyMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// A disabled limiter allows everything without touching the store
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Count one request against `key` and decide whether it may proceed.
    ///
    /// The first request in a window arms the expiry. Up to `limit` requests
    /// per window are allowed.
    pub async fn check(&self, key: &RateLimitKey, limit: u64, window_seconds: u64) -> RateLimitDecision {
        if !self.enabled {
            return RateLimitDecision::Allowed;
        }

        match self.try_check(key, limit, window_seconds).await {
            Ok(decision) => {
                self.record(match decision {
                    RateLimitDecision::Allowed => "allowed",
                    RateLimitDecision::Blocked => "blocked",
                });
                decision
            }
            Err(e) => {
                warn!(key = %key, error = %e, "rate limit store unavailable, allowing request");
                self.record("fail_open");
                RateLimitDecision::Allowed
            }
        }
    }

    /// Check against a configured rule
    pub async fn check_rule(&self, key: &RateLimitKey, rule: &RateLimitRule) -> RateLimitDecision {
        self.check(key, rule.limit, rule.window_seconds).await
    }

    async fn try_check(&self, key: &RateLimitKey, limit: u64, window_seconds: u64) -> Result<RateLimitDecision> {
        // shortest window the store can express
        let window = Duration::from_secs(window_seconds.max(1));
        let hits = self.repository.incr(key.as_str()).await?;

        // a failed expire leaves a counter with no window; it keeps blocking
        // until removed by hand
        if hits == 1 {
            if let Err(e) = self.repository.expire(key.as_str(), window).await {
                warn!(key = %key, error = %e, "failed to set rate limit window");
            }
        }

        if hits <= limit {
            return Ok(RateLimitDecision::Allowed);
        }
        debug!(key = %key, hits, limit, "rate limited");
        Ok(RateLimitDecision::Blocked)
    }

    /// Remaining allowance for `key` without counting a request.
    ///
    /// Reports the full limit and no reset time when the store is unavailable.
    pub async fn info(&self, key: &RateLimitKey, limit: u64) -> RateLimitInfo {
        match self.try_info(key, limit).await {
            Ok(info) => info,
            Err(e) => {
                warn!(key = %key, error = %e, "rate limit info unavailable");
                RateLimitInfo {
                    remaining: limit,
                    reset_at: None,
                }
            }
        }
    }

    async fn try_info(&self, key: &RateLimitKey, limit: u64) -> Result<RateLimitInfo> {
        let hits = self.repository.hits(key.as_str()).await?;
        let ttl = self.repository.ttl(key.as_str()).await?;

        let reset_at = match ttl {
            Some(ttl) => chrono::Duration::from_std(ttl)
                .ok()
                .map(|ttl| self.clock.now() + ttl),
            None => None,
        };

        Ok(RateLimitInfo {
            remaining: limit.saturating_sub(hits),
            reset_at,
        })
    }

    fn record(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.record_rate_limit(outcome);
        }
    }
}
