//! 存储层模块
//!
//! 提供计数、会话记录和限流窗口的持久化，支持 Redis 和进程内存储。

pub mod factory;
pub mod keys;
pub mod memory;
pub mod repository;

#[cfg(feature = "redis")]
pub mod redis;

pub use factory::{StorageFactory, StoreHandles};
pub use memory::MemoryStore;
pub use repository::{
    LeaderboardRepository, RateLimitRepository, SessionRemoval, StoreHealth,
    SubmissionRepository, TallyRepository,
};
