//! 排行榜服务
//!
//! 全局单词计数以及按计数降序的排名视图。计数相同的单词按字典序升序排列。

use std::sync::Arc;
use tracing::{error, warn};

use crate::error::Result;
use crate::models::WordCount;
use crate::models::adjective::rank;
use crate::observability::TallyMetrics;
use crate::storage::repository::LeaderboardRepository;

/// 排行榜服务
#[derive(Clone)]
pub struct Leaderboard {
    repository: Arc<dyn LeaderboardRepository>,
    metrics: Option<TallyMetrics>,
}

impl Leaderboard {
    pub fn new(repository: Arc<dyn LeaderboardRepository>) -> Self {
        Self {
            repository,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: TallyMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// 计数加一，返回新计数
    pub async fn increment(&self, word: &str) -> Result<u64> {
        let count = self.repository.increment(word).await?;
        Ok(count.max(0) as u64)
    }

    /// 计数减一，返回新计数。计数归零时单词从排行榜移除。
    ///
    /// 对不存在的单词减一属于不变量被破坏：记录错误日志并返回 0。
    pub async fn decrement(&self, word: &str) -> Result<u64> {
        let count = self.repository.decrement(word).await?;
        if count < 0 {
            error!(word, count, "word count went negative; entry deleted");
            if let Some(metrics) = &self.metrics {
                metrics.invariant_violations_total.inc();
            }
        }
        Ok(count.max(0) as u64)
    }

    /// 单词当前计数；不存在时为 0
    pub async fn count_of(&self, word: &str) -> Result<u64> {
        let count = self.repository.count(word).await?;
        Ok(count.unwrap_or(0).max(0) as u64)
    }

    /// 前 `limit` 名；存储不可用时返回空列表
    pub async fn top(&self, limit: usize) -> Vec<WordCount> {
        match self.try_top(limit).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(limit, error = %e, "leaderboard unavailable, returning empty view");
                if let Some(metrics) = &self.metrics {
                    metrics.record_degraded_read("top");
                }
                Vec::new()
            }
        }
    }

    /// 前 `limit` 名，存储错误原样返回
    pub async fn try_top(&self, limit: usize) -> Result<Vec<WordCount>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let candidates = self.repository.top(limit).await?;
        Ok(rank(candidates, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use mockall::mock;
    use rstest::rstest;

    mock! {
        Board {}

        #[async_trait]
        impl LeaderboardRepository for Board {
            async fn increment(&self, word: &str) -> Result<i64>;
            async fn decrement(&self, word: &str) -> Result<i64>;
            async fn count(&self, word: &str) -> Result<Option<i64>>;
            async fn top(&self, limit: usize) -> Result<Vec<WordCount>>;
        }
    }

    fn board() -> Leaderboard {
        Leaderboard::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_increment_creates_entry() {
        let board = board();
        assert_eq!(board.increment("kind").await.unwrap(), 1);
        assert_eq!(board.increment("kind").await.unwrap(), 2);
        assert_eq!(board.count_of("kind").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_decrement_to_zero_removes_entry() {
        let board = board();
        board.increment("kind").await.unwrap();
        board.increment("funny").await.unwrap();

        assert_eq!(board.decrement("kind").await.unwrap(), 0);
        assert_eq!(board.top(10).await, vec![WordCount::new("funny", 1)]);
        assert_eq!(board.count_of("kind").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_decrement_absent_word_clamps_to_zero() {
        let metrics = TallyMetrics::new().unwrap();
        let board = board().with_metrics(metrics.clone());

        assert_eq!(board.decrement("ghost").await.unwrap(), 0);
        assert!(board.top(10).await.is_empty());
        assert!(
            metrics
                .gather()
                .unwrap()
                .contains("tally_invariant_violations_total 1")
        );
    }

    #[rstest]
    #[case(0, vec![])]
    #[case(1, vec![("kind", 3)])]
    #[case(2, vec![("kind", 3), ("apt", 1)])]
    #[case(10, vec![("kind", 3), ("apt", 1), ("brave", 1), ("zany", 1)])]
    #[tokio::test]
    async fn test_top_breaks_ties_lexically(
        #[case] limit: usize,
        #[case] expected: Vec<(&str, u64)>,
    ) {
        let board = board();
        for word in ["zany", "kind", "brave", "kind", "apt", "kind"] {
            board.increment(word).await.unwrap();
        }

        let expected: Vec<WordCount> = expected
            .into_iter()
            .map(|(word, count)| WordCount::new(word, count))
            .collect();
        assert_eq!(board.top(limit).await, expected);
    }

    #[tokio::test]
    async fn test_top_is_stable_without_writes() {
        let board = board();
        for word in ["kind", "funny", "brave", "kind"] {
            board.increment(word).await.unwrap();
        }

        let first = board.top(10).await;
        for _ in 0..5 {
            assert_eq!(board.top(10).await, first);
        }
    }

    #[tokio::test]
    async fn test_top_degrades_when_store_down() {
        let mut repository = MockBoard::new();
        repository
            .expect_top()
            .returning(|_| Err(AppError::StoreUnavailable("connection refused".into())));

        let board = Leaderboard::new(Arc::new(repository));
        assert!(board.top(10).await.is_empty());
        assert!(matches!(
            board.try_top(10).await,
            Err(AppError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_top_zero_skips_store() {
        let mut repository = MockBoard::new();
        repository.expect_top().never();

        let board = Leaderboard::new(Arc::new(repository));
        assert!(board.top(0).await.is_empty());
    }
}
