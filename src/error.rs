//! 错误处理模块
//!
//! 定义应用程序的错误类型和错误处理逻辑。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 存储不可达（连接失败、连接中断、超时）
    #[error("存储不可用: {0}")]
    StoreUnavailable(String),

    /// 存储返回了错误应答
    #[error("存储错误: {0}")]
    Store(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 会话提交次数已达上限
    #[error("Maximum {limit} submissions reached")]
    SubmissionLimitReached { limit: u64 },

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the caller may retry the same operation later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_io_error()
            || e.is_connection_dropped()
            || e.is_connection_refusal()
            || e.is_timeout()
        {
            AppError::StoreUnavailable(e.to_string())
        } else {
            AppError::Store(e.to_string())
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;
