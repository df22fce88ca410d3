use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::models::WordCount;

/// 会话提交记录仓储
///
/// 只负责 `session:<id>` 列表本身，不触碰全局计数。
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// 追加一个单词，返回追加后的列表长度
    async fn append(&self, session_id: &str, word: &str) -> Result<u64>;

    /// 按提交顺序读取单词；会话不存在时为空
    async fn words(&self, session_id: &str) -> Result<Vec<String>>;

    /// 列表长度；会话不存在时为 0
    async fn len(&self, session_id: &str) -> Result<u64>;

    /// 原子地读取并删除会话记录；会话不存在时为空
    async fn take(&self, session_id: &str) -> Result<Vec<String>>;

    /// 所有已知会话标识
    async fn session_ids(&self) -> Result<Vec<String>>;
}

/// 排行榜仓储
///
/// 维护 `adjectives:<word>` 计数和 `adjectives:sorted` 有序索引，两者总是一起更新。
#[async_trait]
pub trait LeaderboardRepository: Send + Sync {
    /// 计数加一并更新索引，返回新计数
    async fn increment(&self, word: &str) -> Result<i64>;

    /// 计数减一；结果 <= 0 时删除计数和索引成员。返回减一后的原始值（可能为负）
    async fn decrement(&self, word: &str) -> Result<i64>;

    /// 当前计数
    async fn count(&self, word: &str) -> Result<Option<i64>>;

    /// 按计数降序返回至少 `limit` 条候选（不足时全部返回），
    /// 并包含所有与最后一条计数相同的单词，调用方负责最终排序和截断
    async fn top(&self, limit: usize) -> Result<Vec<WordCount>>;
}

/// 原子聚合操作
///
/// 会话记录与全局计数之间的不变量只通过这里维护，每个方法在存储端都是一个不可分割的单元。
#[async_trait]
pub trait TallyRepository: Send + Sync {
    /// 追加单词、计数加一、更新索引。返回 (会话长度, 单词新计数)
    async fn submit(&self, session_id: &str, word: &str) -> Result<(u64, i64)>;

    /// 读取会话单词、逐个撤销计数、删除会话记录
    async fn remove_session(&self, session_id: &str) -> Result<SessionRemoval>;

    /// 删除所有会话、计数和索引，返回删除的键数量
    async fn clear(&self) -> Result<u64>;
}

/// `TallyRepository::remove_session` 的存储层结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRemoval {
    /// 会话中记录的单词
    pub words: Vec<String>,
    /// 计数正好归零而被移除的单词
    pub pruned: Vec<String>,
    /// 计数跌破零的单词（不变量被破坏）
    pub underflows: Vec<String>,
}

/// 固定窗口限流计数仓储
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// 计数加一，返回新值
    async fn incr(&self, key: &str) -> Result<u64>;

    /// 设置过期时间；键不存在时返回 false
    async fn expire(&self, key: &str, window: Duration) -> Result<bool>;

    /// 当前计数；不存在或已过期时为 0
    async fn hits(&self, key: &str) -> Result<u64>;

    /// 剩余存活时间；键不存在或没有过期时间时为 None
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;
}

/// 存储健康检查
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<()>;
}
