use crate::config::config::AppConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// 配置加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从默认路径加载配置
    ///
    /// 合并顺序：
    /// 1. 内置默认值
    /// 2. ./sentient.toml（可选）
    /// 3. 环境变量 `SENTIENT_`（`__` 分隔嵌套字段）
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
            .merge(Env::prefixed("SENTIENT_").split("__"))
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<(), ConfigValidationError> {
        if config.model.name.trim().is_empty() {
            return Err(ConfigValidationError::MissingModelName);
        }

        if config.model.base_url.trim().is_empty() {
            return Err(ConfigValidationError::MissingModelUrl);
        }

        if config.conversation.greeting_exchanges == 0 {
            return Err(ConfigValidationError::InvalidGreetingExchanges);
        }

        if config.conversation.inactivity_timeout == 0 {
            return Err(ConfigValidationError::InvalidInactivityTimeout);
        }

        let threshold = config.emotion.confidence_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigValidationError::InvalidConfidenceThreshold(threshold));
        }

        if config.emotion.enabled
            && !config.emotion.capture_command.iter().any(|arg| arg.contains("{path}"))
        {
            return Err(ConfigValidationError::InvalidCaptureCommand);
        }

        Ok(())
    }
}

/// 配置验证错误
#[derive(thiserror::Error, Debug)]
pub enum ConfigValidationError {
    #[error("模型名称未配置")]
    MissingModelName,

    #[error("模型服务地址未配置")]
    MissingModelUrl,

    #[error("寒暄交流次数无效，必须大于 0")]
    InvalidGreetingExchanges,

    #[error("无操作超时无效，必须大于 0")]
    InvalidInactivityTimeout,

    #[error("置信度阈值无效，必须在 0 到 100 之间: {0}")]
    InvalidConfidenceThreshold(f64),

    #[error("抓帧命令必须包含 {{path}} 占位符")]
    InvalidCaptureCommand,
}

/// 获取默认配置文件路径
pub fn default_config_path() -> PathBuf {
    PathBuf::from("sentient.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::config::AssessmentStrategy;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.conversation.inactivity_timeout, 42);
        assert_eq!(config.conversation.greeting_exchanges, 2);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = ConfigLoader::load_from("/nonexistent/sentient.toml").unwrap();
        assert_eq!(config.model.name, "llama3.2");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[model]
name = "mistral"

[conversation]
greeting_exchanges = 3
assessment_strategy = "one_per_trait"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from(file.path()).unwrap();
        assert_eq!(config.model.name, "mistral");
        assert_eq!(config.model.base_url, "http://localhost:11434");
        assert_eq!(config.conversation.greeting_exchanges, 3);
        assert_eq!(
            config.conversation.assessment_strategy,
            AssessmentStrategy::OnePerTrait
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.conversation.greeting_exchanges = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidGreetingExchanges)
        ));

        let mut config = AppConfig::default();
        config.emotion.confidence_threshold = 600.0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidConfidenceThreshold(_))
        ));

        let mut config = AppConfig::default();
        config.emotion.capture_command = vec!["fswebcam".into()];
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigValidationError::InvalidCaptureCommand)
        ));
    }
}
