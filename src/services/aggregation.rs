//! 聚合服务
//!
//! 会话记录与全局计数之间的不变量只在这里维护：
//! 任一单词的计数等于所有存活会话中该单词出现次数之和。
//!
//! 提交和撤销会话都是存储端的单个原子操作，并发读者不会看到只完成了一半的状态，
//! 超时或失败后重试也不会重复扣减计数。写操作在存储不可用时直接失败（fail closed）。

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::models::{RemovalReport, SubmitReceipt, WordCount};
use crate::observability::TallyMetrics;
use crate::services::leaderboard::Leaderboard;
use crate::services::submissions::SessionSubmissions;
use crate::storage::StoreHandles;
use crate::storage::repository::TallyRepository;

/// 聚合服务
#[derive(Clone)]
pub struct AggregationService {
    tally: Arc<dyn TallyRepository>,
    submissions: SessionSubmissions,
    leaderboard: Leaderboard,
    metrics: Option<TallyMetrics>,
}

impl AggregationService {
    pub fn new(
        tally: Arc<dyn TallyRepository>,
        submissions: SessionSubmissions,
        leaderboard: Leaderboard,
    ) -> Self {
        Self {
            tally,
            submissions,
            leaderboard,
            metrics: None,
        }
    }

    /// 从存储句柄创建
    pub fn from_handles(handles: &StoreHandles) -> Self {
        Self::new(
            handles.tally.clone(),
            SessionSubmissions::new(handles.submissions.clone()),
            Leaderboard::new(handles.leaderboard.clone()),
        )
    }

    pub fn with_metrics(mut self, metrics: TallyMetrics) -> Self {
        self.submissions = self.submissions.with_metrics(metrics.clone());
        self.leaderboard = self.leaderboard.with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn submissions(&self) -> &SessionSubmissions {
        &self.submissions
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// 提交一个单词，返回会话的提交次数
    ///
    /// 不检查提交上限，上限由调用方（见 [`SubmissionPolicy`](super::SubmissionPolicy)）负责。
    pub async fn submit(&self, session_id: &str, word: &str) -> Result<u64> {
        Ok(self.submit_with_receipt(session_id, word).await?.session_count)
    }

    /// 提交一个单词，同时返回单词的新计数
    pub async fn submit_with_receipt(&self, session_id: &str, word: &str) -> Result<SubmitReceipt> {
        let (session_count, word_count) = self.tally.submit(session_id, word).await?;
        let receipt = SubmitReceipt {
            session_count,
            word_count: word_count.max(0) as u64,
        };

        debug!(
            session_id,
            word,
            session_count = receipt.session_count,
            word_count = receipt.word_count,
            "submission recorded"
        );
        if let Some(metrics) = &self.metrics {
            metrics.submissions_total.inc();
        }
        Ok(receipt)
    }

    /// 撤销一个会话的全部提交并删除会话记录；会话不存在时什么也不做
    pub async fn remove_session(&self, session_id: &str) -> Result<RemovalReport> {
        let removal = self.tally.remove_session(session_id).await?;

        for word in &removal.underflows {
            error!(session_id, word, "word count went negative while removing session; entry deleted");
        }
        if let Some(metrics) = &self.metrics {
            metrics
                .invariant_violations_total
                .inc_by(removal.underflows.len() as u64);
            if !removal.words.is_empty() {
                metrics.sessions_removed_total.inc();
            }
        }

        // a word submitted several times may be both pruned and underflowed
        let mut pruned: Vec<String> = Vec::with_capacity(removal.pruned.len());
        for word in removal.pruned.into_iter().chain(removal.underflows) {
            if !pruned.contains(&word) {
                pruned.push(word);
            }
        }

        let report = RemovalReport {
            session_id: session_id.to_string(),
            words_removed: removal.words.len(),
            pruned,
        };
        if report.is_noop() {
            debug!(session_id, "remove_session on unknown session");
        } else {
            info!(
                session_id,
                words_removed = report.words_removed,
                pruned = report.pruned.len(),
                "session removed"
            );
        }
        Ok(report)
    }

    /// 清空所有会话、计数和排行榜（限流窗口保留），返回删除的键数量
    pub async fn reset(&self) -> Result<u64> {
        let removed = self.tally.clear().await?;
        info!(removed, "tally reset");
        Ok(removed)
    }

    /// 前 `limit` 名；存储不可用时为空
    pub async fn top(&self, limit: usize) -> Vec<WordCount> {
        self.leaderboard.top(limit).await
    }

    /// 会话的提交次数；存储不可用时为 0
    pub async fn session_count(&self, session_id: &str) -> u64 {
        self.submissions.count(session_id).await
    }
}
