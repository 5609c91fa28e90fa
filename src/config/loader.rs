//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;
use crate::domain::voice::ModelId;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `KITTEN_`，层级分隔符 `__`）
/// 2. 配置文件（config_path，未指定时搜索 config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `KITTEN_ENGINE__INTERPRETER=python3.11`
/// - `KITTEN_ENGINE__SCRIPT=/opt/kitten/python-bridge.py`
/// - `KITTEN_ENGINE__TIMEOUT_SECS=60`
/// - `KITTEN_LOG__LEVEL=debug`
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("engine.interpreter", "python3")?
        .set_default("engine.script", "python-bridge.py")?
        .set_default("engine.model", ModelId::DEFAULT)?
        .set_default("engine.timeout_secs", 0)?
        .set_default("engine.max_concurrent", 0)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: KITTEN_ENGINE__MODEL=KittenML/kitten-tts-mini-0.1
    builder = builder.add_source(
        Environment::with_prefix("KITTEN")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.engine.interpreter.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Engine interpreter cannot be empty".to_string(),
        ));
    }

    if config.engine.script.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Engine script cannot be empty".to_string(),
        ));
    }

    ModelId::new(config.engine.model.as_str())
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::debug!("=== Bridge Configuration ===");
    tracing::debug!("Interpreter: {}", config.engine.interpreter);
    tracing::debug!("Engine Script: {}", config.engine.script.display());
    tracing::debug!("Model: {}", config.engine.model);
    match config.engine.timeout() {
        Some(timeout) => tracing::debug!("Timeout: {}s", timeout.as_secs()),
        None => tracing::debug!("Timeout: none"),
    }
    match config.engine.concurrency_limit() {
        Some(limit) => tracing::debug!("Max Concurrent: {}", limit),
        None => tracing::debug!("Max Concurrent: unbounded"),
    }
    tracing::debug!("Log Level: {}", config.log.level);
    tracing::debug!("============================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_interpreter() {
        let mut config = AppConfig::default();
        config.engine.interpreter = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_script() {
        let mut config = AppConfig::default();
        config.engine.script = std::path::PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_model() {
        let mut config = AppConfig::default();
        config.engine.model = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[engine]\ninterpreter = \"python3.12\"\nmodel = \"custom/model\"\n\
             timeout_secs = 15\n\n[log]\nlevel = \"debug\""
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.engine.interpreter, "python3.12");
        assert_eq!(config.engine.model, "custom/model");
        assert_eq!(config.engine.timeout_secs, 15);
        assert_eq!(config.engine.max_concurrent, 0);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_load_rejects_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_config_from_path(Some(&path)).is_err());
    }
}
