use serde::{Deserialize, Serialize};

/// 会话提交记录
///
/// 一个参与者按提交顺序记录的单词列表。同一单词可以出现多次，
/// 每次出现都分别计入会话计数和全局计数。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// 会话唯一标识（由外部身份提供方签发）
    pub id: String,
    /// 已提交的单词（按提交顺序）
    pub words: Vec<String>,
}

impl SessionRecord {
    pub fn new(id: impl Into<String>, words: Vec<String>) -> Self {
        Self {
            id: id.into(),
            words,
        }
    }

    /// 提交次数
    pub fn count(&self) -> usize {
        self.words.len()
    }
}

/// 一次提交之后的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// 会话的提交次数（包含本次）
    pub session_count: u64,
    /// 该单词的全局计数（包含本次）
    pub word_count: u64,
}

/// 删除会话的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalReport {
    /// 会话标识
    pub session_id: String,
    /// 被撤销的提交次数（会话不存在时为 0）
    pub words_removed: usize,
    /// 计数归零、已从排行榜移除的单词
    pub pruned: Vec<String>,
}

impl RemovalReport {
    /// Whether the session existed at all.
    pub fn is_noop(&self) -> bool {
        self.words_removed == 0
    }
}
