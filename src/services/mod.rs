//! 服务模块

pub mod aggregation;
pub mod leaderboard;
pub mod policy;
pub mod submissions;

pub use aggregation::AggregationService;
pub use leaderboard::Leaderboard;
pub use policy::SubmissionPolicy;
pub use submissions::SessionSubmissions;

use crate::config::AppConfig;
use crate::observability::TallyMetrics;
use crate::security::RateLimiter;
use crate::storage::StoreHandles;

/// 一组共享同一存储的服务
#[derive(Clone)]
pub struct TallyServices {
    pub aggregation: AggregationService,
    pub rate_limiter: RateLimiter,
    pub policy: SubmissionPolicy,
    pub metrics: Option<TallyMetrics>,
}

/// 根据配置组装服务
pub fn create_services(
    handles: &StoreHandles,
    config: &AppConfig,
    metrics: Option<TallyMetrics>,
) -> TallyServices {
    let mut aggregation = AggregationService::from_handles(handles);
    let mut rate_limiter =
        RateLimiter::from_settings(handles.rate_limits.clone(), &config.rate_limits);
    if let Some(metrics) = &metrics {
        aggregation = aggregation.with_metrics(metrics.clone());
        rate_limiter = rate_limiter.with_metrics(metrics.clone());
    }

    TallyServices {
        aggregation,
        rate_limiter,
        policy: SubmissionPolicy::from_config(&config.limits),
        metrics,
    }
}
