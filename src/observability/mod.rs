//! 可观测性模块
//!
//! 提供 Prometheus 指标、结构化日志和存储健康检查。

use chrono::{DateTime, Utc};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;
use std::time::Instant;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::config::LoggingConfig;
use crate::error::{AppError, Result};
use crate::storage::StoreHandles;

// ===== Metrics =====

/// 应用指标
#[derive(Clone)]
pub struct TallyMetrics {
    registry: Registry,
    pub submissions_total: IntCounter,
    pub sessions_removed_total: IntCounter,
    pub rate_limit_decisions: IntCounterVec,
    pub degraded_reads_total: IntCounterVec,
    pub invariant_violations_total: IntCounter,
}

impl TallyMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let submissions_total =
            IntCounter::new("tally_submissions_total", "Accepted word submissions")
                .map_err(metrics_error)?;
        let sessions_removed_total =
            IntCounter::new("tally_sessions_removed_total", "Sessions removed by an admin")
                .map_err(metrics_error)?;
        let rate_limit_decisions = IntCounterVec::new(
            Opts::new("tally_rate_limit_decisions_total", "Rate limit outcomes"),
            &["outcome"],
        )
        .map_err(metrics_error)?;
        let degraded_reads_total = IntCounterVec::new(
            Opts::new(
                "tally_degraded_reads_total",
                "Reads answered empty because the store failed",
            ),
            &["read"],
        )
        .map_err(metrics_error)?;
        let invariant_violations_total = IntCounter::new(
            "tally_invariant_violations_total",
            "Word counts that would have gone negative",
        )
        .map_err(metrics_error)?;

        registry
            .register(Box::new(submissions_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(sessions_removed_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(rate_limit_decisions.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(degraded_reads_total.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(invariant_violations_total.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            submissions_total,
            sessions_removed_total,
            rate_limit_decisions,
            degraded_reads_total,
            invariant_violations_total,
        })
    }

    /// 记录限流结果（allowed / blocked / fail_open）
    pub fn record_rate_limit(&self, outcome: &str) {
        self.rate_limit_decisions.with_label_values(&[outcome]).inc();
    }

    /// 记录降级读取
    pub fn record_degraded_read(&self, read: &str) {
        self.degraded_reads_total.with_label_values(&[read]).inc();
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(metrics_error)
    }
}

fn metrics_error(e: prometheus::Error) -> AppError {
    AppError::Internal(format!("metrics: {e}"))
}

// ===== Health Check =====

/// 健康检查状态
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub checks: Vec<HealthCheck>,
}

/// 单个健康检查项
#[derive(Debug, Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
    pub latency_ms: u64,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(|c| c.healthy)
    }
}

/// 检查存储连通性
pub async fn check_health(handles: &StoreHandles) -> HealthStatus {
    let start = Instant::now();
    let ping = handles.health.ping().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let check = HealthCheck {
        name: "store".to_string(),
        healthy: ping.is_ok(),
        message: ping.err().map(|e| e.to_string()),
        latency_ms,
    };
    let status = if check.healthy { "healthy" } else { "unhealthy" };

    HealthStatus {
        status: status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: vec![check],
    }
}

// ===== Structured Logging =====

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的级别。配置了 `log_dir` 时额外按天滚动写文件，
/// 返回的 guard 必须存活到进程退出，否则缓冲中的日志会丢失。
pub fn init_tracing(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| AppError::Config(format!("invalid log level {}: {e}", config.level)))?;

    let (file_writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(writer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.structured {
        registry
            .with(fmt::layer().json().with_target(true))
            .with(file_writer.map(|w| fmt::layer().json().with_ansi(false).with_writer(w)))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(file_writer.map(|w| fmt::layer().with_ansi(false).with_writer(w)))
            .try_init()
    };
    result.map_err(|e| AppError::Internal(format!("tracing already initialized: {e}")))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::sync::Arc;

    #[test]
    fn test_metrics_gather() {
        let metrics = TallyMetrics::new().unwrap();
        metrics.submissions_total.inc();
        metrics.record_rate_limit("blocked");
        metrics.record_degraded_read("top");

        let output = metrics.gather().unwrap();
        assert!(output.contains("tally_submissions_total 1"));
        assert!(output.contains("tally_rate_limit_decisions_total{outcome=\"blocked\"} 1"));
        assert!(output.contains("tally_degraded_reads_total{read=\"top\"} 1"));
    }

    #[tokio::test]
    async fn test_memory_store_is_healthy() {
        let handles = StoreHandles::from_store(Arc::new(MemoryStore::new()));
        let status = check_health(&handles).await;

        assert!(status.is_healthy());
        assert_eq!(status.status, "healthy");
        assert_eq!(status.checks[0].name, "store");
    }
}
