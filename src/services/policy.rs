//! 提交策略
//!
//! 聚合服务本身不限制提交次数，也不校验单词。这里是调用方使用的策略层：
//! 先归一化单词，再检查会话的提交上限，最后提交。
//!
//! 上限检查与提交不是原子的：同一会话的并发请求可能都通过检查，使该会话略微超出上限。

use tracing::debug;

use crate::config::config::LimitsConfig;
use crate::error::{AppError, Result};
use crate::services::aggregation::AggregationService;
use crate::services::submissions::SessionSubmissions;

/// 提交策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionPolicy {
    /// 每个会话最多提交的单词数
    pub max_submissions: u64,
    /// 单词最大长度（字符）
    pub max_word_length: usize,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self::from_config(&LimitsConfig::default())
    }
}

impl SubmissionPolicy {
    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self {
            max_submissions: limits.max_submissions_per_session,
            max_word_length: limits.max_word_length,
        }
    }

    /// 去掉首尾空白并转为小写
    pub fn normalize(&self, raw: &str) -> Result<String> {
        let word = raw.trim().to_lowercase();
        if word.is_empty() {
            return Err(AppError::Validation("word cannot be empty".into()));
        }
        if word.chars().count() > self.max_word_length {
            return Err(AppError::Validation(format!(
                "word is too long (max {} characters)",
                self.max_word_length
            )));
        }
        Ok(word)
    }

    /// 检查会话是否还能提交，返回剩余次数。存储错误原样返回。
    pub async fn admit(&self, submissions: &SessionSubmissions, session_id: &str) -> Result<u64> {
        let count = submissions.try_count(session_id).await?;
        if count >= self.max_submissions {
            debug!(session_id, count, "submission cap reached");
            return Err(AppError::SubmissionLimitReached {
                limit: self.max_submissions,
            });
        }
        Ok(self.max_submissions - count)
    }

    /// 归一化、检查上限、提交，返回会话的提交次数
    pub async fn submit(
        &self,
        service: &AggregationService,
        session_id: &str,
        raw: &str,
    ) -> Result<u64> {
        let word = self.normalize(raw)?;
        self.admit(service.submissions(), session_id).await?;
        service.submit(session_id, &word).await
    }
}
