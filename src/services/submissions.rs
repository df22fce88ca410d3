//! 会话提交记录服务
//!
//! 每个会话按提交顺序保存的单词列表。这里的写操作只作用于会话记录本身，
//! 与排行榜同步的提交和撤销请走 [`AggregationService`](super::AggregationService)。

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::SessionRecord;
use crate::observability::TallyMetrics;
use crate::storage::repository::SubmissionRepository;

/// 会话提交记录服务
#[derive(Clone)]
pub struct SessionSubmissions {
    repository: Arc<dyn SubmissionRepository>,
    metrics: Option<TallyMetrics>,
}

impl SessionSubmissions {
    pub fn new(repository: Arc<dyn SubmissionRepository>) -> Self {
        Self {
            repository,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: TallyMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 追加一个单词（会话不存在时创建），返回会话的提交次数
    pub async fn append(&self, session_id: &str, word: &str) -> Result<u64> {
        let count = self.repository.append(session_id, word).await?;
        debug!(session_id, word, count, "appended word to session");
        Ok(count)
    }

    /// 会话的提交次数；会话不存在或存储不可用时为 0
    pub async fn count(&self, session_id: &str) -> u64 {
        match self.try_count(session_id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(session_id, error = %e, "submission count unavailable, reporting 0");
                if let Some(metrics) = &self.metrics {
                    metrics.record_degraded_read("count");
                }
                0
            }
        }
    }

    /// 会话的提交次数，存储错误原样返回
    pub async fn try_count(&self, session_id: &str) -> Result<u64> {
        self.repository.len(session_id).await
    }

    /// 会话提交过的单词；会话不存在时为空
    pub async fn words_of(&self, session_id: &str) -> Result<Vec<String>> {
        self.repository.words(session_id).await
    }

    /// 删除会话记录并返回其中的单词；会话不存在不是错误
    pub async fn delete(&self, session_id: &str) -> Result<Vec<String>> {
        let words = self.repository.take(session_id).await?;
        debug!(session_id, words = words.len(), "deleted session record");
        Ok(words)
    }

    /// 列出所有会话及其单词，按会话标识排序
    pub async fn list_all(&self) -> Result<Vec<SessionRecord>> {
        let mut ids = self.repository.session_ids().await?;
        ids.sort();

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            let words = self.repository.words(&id).await?;
            // removed between the scan and the read
            if words.is_empty() {
                continue;
            }
            records.push(SessionRecord::new(id, words));
        }
        Ok(records)
    }
}
