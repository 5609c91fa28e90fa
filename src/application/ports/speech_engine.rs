//! Speech Engine Port - 外部 TTS 引擎抽象
//!
//! 定义与外部引擎交互的最小契约，具体实现在 infrastructure/adapters 层:
//! - synthesize: 合成一次
//! - check_available: 粗粒度可用性探测
//! - install: 安装依赖并流式报告进度

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::synthesis::{SynthesisRequest, SynthesisResult};
use crate::domain::voice::VoiceError;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    /// 音色不在目录中（本地预检，不启动子进程）
    #[error(transparent)]
    InvalidVoice(VoiceError),

    /// 进程非零退出，stderr 原样透出
    #[error("Engine process failed ({}): {stderr}", exit_label(.exit_code))]
    EngineFailure {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// 进程正常退出，但响应中带 error 字段
    #[error("{0}")]
    EngineReportedError(String),

    /// 进程正常退出，但输出无法解析
    #[error("Failed to parse engine output: {0}")]
    ResponseParseError(String),

    /// 运行环境缺失（解释器不在 PATH 上等）
    #[error("Setup error: {0}")]
    SetupError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Engine timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<VoiceError> for TtsError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::InvalidModel(message) => TtsError::InvalidRequest(message),
            other => TtsError::InvalidVoice(other),
        }
    }
}

fn exit_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

/// 安装进度事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallEvent {
    /// `{"status": ...}`
    Status(String),
    /// `{"success": ...}`
    Success(String),
    /// `{"error": ...}`
    Error(String),
    /// 非 JSON 行，原样透传
    Output(String),
    /// stderr 行
    Diagnostic(String),
}

/// 安装进度流
///
/// 作为 `Stream<Item = InstallEvent>` 消费；事件流结束后调用 `finish`
/// 获取最终结果（非零退出 → `EngineFailure`）。
pub struct InstallProgress {
    events: mpsc::Receiver<InstallEvent>,
    completion: JoinHandle<Result<(), TtsError>>,
}

impl InstallProgress {
    pub fn new(
        events: mpsc::Receiver<InstallEvent>,
        completion: JoinHandle<Result<(), TtsError>>,
    ) -> Self {
        Self { events, completion }
    }

    /// 等待安装进程结束
    ///
    /// 未消费的事件会被丢弃
    pub async fn finish(self) -> Result<(), TtsError> {
        let Self { events, completion } = self;
        drop(events);
        completion
            .await
            .map_err(|e| TtsError::IoError(format!("Install task aborted: {}", e)))?
    }
}

impl Stream for InstallProgress {
    type Item = InstallEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

/// Speech Engine Port
///
/// 每次调用都是一次独立的往返，实现方不得在调用之间共享可变状态
#[async_trait]
pub trait SpeechEnginePort: Send + Sync {
    /// 执行一次合成
    ///
    /// 响应结构必须与 `request.mode()` 一致，否则返回 `ResponseParseError`
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, TtsError>;

    /// 检查引擎及模型是否可用
    ///
    /// 不区分不可用的原因，也不返回错误
    async fn check_available(&self) -> bool;

    /// 安装引擎依赖
    async fn install(&self) -> Result<InstallProgress, TtsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_model_maps_to_invalid_request() {
        let err = TtsError::from(VoiceError::InvalidModel("empty".to_string()));
        assert!(matches!(err, TtsError::InvalidRequest(ref m) if m == "empty"));

        let err = TtsError::from(VoiceError::InvalidVoice {
            voice: "bogus".to_string(),
            available: "expr-voice-2-f".to_string(),
        });
        assert!(matches!(err, TtsError::InvalidVoice(_)));
    }

    #[test]
    fn test_engine_failure_message_names_exit_code() {
        let err = TtsError::EngineFailure {
            exit_code: Some(1),
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "Engine process failed (exit code 1): ");

        let err = TtsError::EngineFailure {
            exit_code: None,
            stderr: "killed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Engine process failed (terminated by signal): killed"
        );
    }
}
