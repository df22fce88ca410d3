use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Redis（共享存储，生产环境）
    #[default]
    Redis,
    /// 进程内存储（测试、单进程演示）
    Memory,
}

/// 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// 后端类型
    pub backend: StoreBackend,
    /// Redis 地址
    pub url: String,
    /// 键名前缀（为空时键名与约定的键模式完全一致）
    pub namespace: String,
    /// 连接超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 单条命令超时（毫秒）
    pub command_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Redis,
            url: "redis://localhost:6379".into(),
            namespace: String::new(),
            connect_timeout_ms: 1_000,
            command_timeout_ms: 500,
        }
    }
}

/// 提交策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// 每个会话最多提交的单词数
    pub max_submissions_per_session: u64,
    /// 单词最大长度（字符）
    pub max_word_length: usize,
    /// 排行榜默认展示条数
    pub leaderboard_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_submissions_per_session: 5,
            max_word_length: 50,
            leaderboard_size: 30,
        }
    }
}

/// 单条限流规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// 窗口内允许的请求数
    pub limit: u64,
    /// 窗口长度（秒）
    pub window_seconds: u64,
}

impl RateLimitRule {
    pub const fn new(limit: u64, window_seconds: u64) -> Self {
        Self {
            limit,
            window_seconds,
        }
    }
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Rate limiting 启用
    pub enabled: bool,
    /// 提交单词
    pub submit: RateLimitRule,
    /// 登录尝试
    pub login: RateLimitRule,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            submit: RateLimitRule::new(10, 60),
            login: RateLimitRule::new(5, 60),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 结构化日志格式
    pub structured: bool,
    /// 日志文件目录
    pub log_dir: Option<PathBuf>,
    /// 日志文件名前缀
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            structured: false,
            log_dir: None,
            file_prefix: "adjective-tally.log".into(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// 存储配置
    pub store: StoreConfig,
    /// 提交策略配置
    pub limits: LimitsConfig,
    /// 限流配置
    pub rate_limits: RateLimitSettings,
    /// 日志配置
    pub logging: LoggingConfig,
    /// 应用名称
    pub app_name: String,
    /// 环境
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::development()
    }
}

impl AppConfig {
    /// 创建开发环境配置
    pub fn development() -> Self {
        Self {
            store: StoreConfig::default(),
            limits: LimitsConfig::default(),
            rate_limits: RateLimitSettings::default(),
            logging: LoggingConfig {
                level: "debug".into(),
                ..LoggingConfig::default()
            },
            app_name: "adjective-tally".into(),
            environment: "development".into(),
        }
    }

    /// 创建测试配置（进程内存储）
    pub fn testing() -> Self {
        let mut config = Self::development();
        config.environment = "test".into();
        config.store.backend = StoreBackend::Memory;
        config
    }
}
