use crate::config::config::{AppConfig, StoreBackend};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "TALLY_";

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序（后者覆盖前者）：
    /// 1. 内置默认值
    /// 2. ./tally.toml
    /// 3. 环境变量（`TALLY_` 前缀，`__` 分隔层级，例如 `TALLY_STORE__URL`）
    pub fn load() -> Result<AppConfig, figment::Error> {
        Self::load_from(default_config_path())
    }

    /// 从指定路径加载配置
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig, figment::Error> {
        Self::figment(path.as_ref()).extract()
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.store.backend == StoreBackend::Redis && config.store.url.trim().is_empty() {
            return Err(ConfigValidationError::MissingStoreUrl);
        }

        if config.store.connect_timeout_ms == 0 || config.store.command_timeout_ms == 0 {
            return Err(ConfigValidationError::InvalidTimeout);
        }

        if config.limits.max_submissions_per_session == 0 {
            return Err(ConfigValidationError::InvalidSubmissionCap);
        }

        if config.limits.max_word_length == 0 {
            return Err(ConfigValidationError::InvalidWordLength);
        }

        for (name, rule) in [
            ("submit", &config.rate_limits.submit),
            ("login", &config.rate_limits.login),
        ] {
            if rule.window_seconds == 0 {
                return Err(ConfigValidationError::InvalidWindow(name.to_string()));
            }
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("存储连接 URL 未配置")]
    MissingStoreUrl,

    #[error("超时必须大于 0")]
    InvalidTimeout,

    #[error("会话提交上限必须大于 0")]
    InvalidSubmissionCap,

    #[error("单词最大长度必须大于 0")]
    InvalidWordLength,

    #[error("限流规则 {0} 的窗口必须大于 0")]
    InvalidWindow(String),
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("tally.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = ConfigLoader::load_from("does-not-exist.toml").unwrap();
        assert_eq!(config.limits.max_submissions_per_session, 5);
        assert_eq!(config.limits.max_word_length, 50);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert!(ConfigLoader::validate(&config).is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
app_name = "board"

[store]
backend = "memory"
namespace = "test"

[rate_limits.submit]
limit = 3
window_seconds = 30
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(config.app_name, "board");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.namespace, "test");
        assert_eq!(config.rate_limits.submit.limit, 3);
        assert_eq!(config.rate_limits.submit.window_seconds, 30);
        // untouched sections keep their defaults
        assert_eq!(config.rate_limits.login.limit, 5);
        assert_eq!(config.store.command_timeout_ms, 500);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let mut config = AppConfig::testing();
        config.rate_limits.login.window_seconds = 0;
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidWindow("login".into()))
        );
    }

    #[test]
    fn test_validate_requires_url_for_redis() {
        let mut config = AppConfig::development();
        config.store.url = String::new();
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::MissingStoreUrl)
        );

        config.store.backend = StoreBackend::Memory;
        assert!(ConfigLoader::validate(&config).is_ok());
    }
}
