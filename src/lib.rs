//! Adjective Tally - 形容词投票聚合服务
//!
//! 访客在会话内提交描述某人的形容词，服务维护每个会话的提交记录、
//! 全局单词计数和按计数排序的排行榜，并提供按来源限流的固定窗口计数器。

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod security;
pub mod services;
pub mod storage;
