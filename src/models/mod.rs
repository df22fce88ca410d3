//! 核心数据模型模块
//!
//! 定义单词计数、会话提交记录和限流窗口的数据结构。

pub mod adjective;
pub mod rate_limit;
pub mod session;

pub use adjective::WordCount;
pub use rate_limit::{RateLimitDecision, RateLimitInfo, RateLimitKey};
pub use session::{RemovalReport, SessionRecord, SubmitReceipt};
