use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 单词计数
///
/// 排行榜中的一行：归一化后的单词及其全局出现次数。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WordCount {
    /// 归一化后的单词
    pub word: String,
    /// 全局计数（始终大于 0，计数归零的单词不会出现在排行榜中）
    pub count: u64,
}

impl WordCount {
    pub fn new(word: impl Into<String>, count: u64) -> Self {
        Self {
            word: word.into(),
            count,
        }
    }

    /// Leaderboard order: count descending, then word ascending.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .count
            .cmp(&self.count)
            .then_with(|| self.word.cmp(&other.word))
    }
}

/// Sorts into leaderboard order and keeps at most `limit` rows.
pub fn rank(mut rows: Vec<WordCount>, limit: usize) -> Vec<WordCount> {
    rows.sort_by(WordCount::rank_cmp);
    rows.truncate(limit);
    rows
}
