//! 存储工厂模块
//!
//! 根据配置创建相应的存储实例，并把它拆成各个服务需要的仓储句柄。

use std::sync::Arc;
use tracing::info;

use crate::config::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use crate::storage::memory::MemoryStore;
use crate::storage::repository::{
    LeaderboardRepository, RateLimitRepository, StoreHealth, SubmissionRepository,
    TallyRepository,
};

#[cfg(not(feature = "redis"))]
use crate::error::AppError;
#[cfg(feature = "redis")]
use crate::storage::redis::RedisStore;

/// 同一个存储实例的各仓储视图
#[derive(Clone)]
pub struct StoreHandles {
    pub submissions: Arc<dyn SubmissionRepository>,
    pub leaderboard: Arc<dyn LeaderboardRepository>,
    pub tally: Arc<dyn TallyRepository>,
    pub rate_limits: Arc<dyn RateLimitRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl StoreHandles {
    /// 从实现了全部仓储 trait 的存储创建句柄
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: SubmissionRepository
            + LeaderboardRepository
            + TallyRepository
            + RateLimitRepository
            + StoreHealth
            + 'static,
    {
        Self {
            submissions: store.clone(),
            leaderboard: store.clone(),
            tally: store.clone(),
            rate_limits: store.clone(),
            health: store,
        }
    }
}

/// 存储工厂
pub struct StorageFactory;

impl StorageFactory {
    /// 根据配置创建存储实例
    pub async fn create(config: &StoreConfig) -> Result<StoreHandles> {
        match config.backend {
            StoreBackend::Memory => {
                info!("Using in-process memory store");
                Ok(StoreHandles::from_store(Arc::new(MemoryStore::new())))
            }
            #[cfg(feature = "redis")]
            StoreBackend::Redis => {
                let store = RedisStore::connect(config).await?;
                Ok(StoreHandles::from_store(Arc::new(store)))
            }
            #[cfg(not(feature = "redis"))]
            StoreBackend::Redis => Err(AppError::Config(
                "Redis feature is not enabled. Enable 'redis' feature to use the Redis backend."
                    .into(),
            )),
        }
    }

    /// 检查存储是否可用
    pub async fn health_check(handles: &StoreHandles) -> bool {
        match handles.health.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "store health check failed");
                false
            }
        }
    }
}
