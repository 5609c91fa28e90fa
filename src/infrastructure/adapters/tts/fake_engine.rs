//! Fake Speech Engine - 用于测试的引擎
//!
//! 不启动子进程，始终返回配置的音频数据

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

use crate::application::ports::{InstallEvent, InstallProgress, SpeechEnginePort, TtsError};
use crate::domain::synthesis::{SynthesisRequest, SynthesisResult};

/// Fake Engine 配置
#[derive(Debug, Clone)]
pub struct FakeSpeechEngineConfig {
    /// 固定返回的音频数据
    pub audio_data: Vec<u8>,
    /// check_available 的返回值
    pub available: bool,
    /// 设置后 synthesize 总是返回 EngineReportedError
    pub reported_error: Option<String>,
}

impl Default for FakeSpeechEngineConfig {
    fn default() -> Self {
        Self {
            audio_data: b"RIFF\0\0\0\0WAVE".to_vec(),
            available: true,
            reported_error: None,
        }
    }
}

/// Fake Speech Engine
///
/// 记录 synthesize 调用次数，用于验证预检失败时没有发起调用
pub struct FakeSpeechEngine {
    config: FakeSpeechEngineConfig,
    synthesize_calls: AtomicUsize,
}

impl FakeSpeechEngine {
    pub fn new(config: FakeSpeechEngineConfig) -> Self {
        tracing::debug!(
            audio_size = config.audio_data.len(),
            available = config.available,
            "FakeSpeechEngine initialized"
        );
        Self {
            config,
            synthesize_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeSpeechEngineConfig::default())
    }

    /// synthesize 被调用的次数
    pub fn synthesize_calls(&self) -> usize {
        self.synthesize_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechEnginePort for FakeSpeechEngine {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, TtsError> {
        self.synthesize_calls.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(
            text_len = request.text().len(),
            voice = %request.voice(),
            "FakeSpeechEngine: returning fixed audio"
        );

        if let Some(error) = &self.config.reported_error {
            return Err(TtsError::EngineReportedError(error.clone()));
        }

        match request.output_path() {
            Some(path) => {
                tokio::fs::write(path, &self.config.audio_data)
                    .await
                    .map_err(|e| TtsError::IoError(e.to_string()))?;
                Ok(SynthesisResult::File {
                    output_path: path.to_path_buf(),
                })
            }
            None => Ok(SynthesisResult::Audio {
                bytes: self.config.audio_data.clone(),
            }),
        }
    }

    async fn check_available(&self) -> bool {
        self.config.available
    }

    async fn install(&self) -> Result<InstallProgress, TtsError> {
        let (tx, rx) = mpsc::channel(2);
        let completion = tokio::spawn(async move {
            let _ = tx
                .send(InstallEvent::Status("Fake engine already available".to_string()))
                .await;
            Ok(())
        });
        Ok(InstallProgress::new(rx, completion))
    }
}
