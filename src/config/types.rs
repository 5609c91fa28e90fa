//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::domain::voice::ModelId;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 外部引擎配置
    #[serde(default)]
    pub engine: EngineConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 外部引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// 解释器（需在 PATH 上可解析）
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// 引擎入口脚本
    #[serde(default = "default_script")]
    pub script: PathBuf,

    /// 加载的模型标识
    #[serde(default = "default_model")]
    pub model: String,

    /// 单次调用超时（秒），0 表示不限制
    #[serde(default)]
    pub timeout_secs: u64,

    /// 最大并发子进程数，0 表示不限制
    #[serde(default)]
    pub max_concurrent: usize,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_script() -> PathBuf {
    PathBuf::from("python-bridge.py")
}

fn default_model() -> String {
    ModelId::DEFAULT.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script: default_script(),
            model: default_model(),
            timeout_secs: 0,
            max_concurrent: 0,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent > 0).then_some(self.max_concurrent)
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
