//! TTS Client - 面向调用方的桥接客户端
//!
//! 校验音色、构造请求，并交给 SpeechEnginePort 执行。
//! 只持有构造时确定的不可变配置，每次调用相互独立。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::ports::{InstallProgress, SpeechEnginePort, TtsError};
use crate::config::EngineConfig;
use crate::domain::synthesis::{SynthesisRequest, SynthesisResult};
use crate::domain::voice::{ModelId, VoiceId};
use crate::infrastructure::adapters::{SubprocessEngine, SubprocessEngineConfig};

/// TTS 桥接客户端
#[derive(Clone)]
pub struct TtsClient {
    engine: Arc<dyn SpeechEnginePort>,
    model: ModelId,
}

impl TtsClient {
    /// 创建客户端，model 为 None 时使用默认模型
    pub fn new(engine: Arc<dyn SpeechEnginePort>, model: Option<ModelId>) -> Self {
        Self {
            engine,
            model: model.unwrap_or_default(),
        }
    }

    /// 使用子进程引擎创建客户端
    pub fn from_config(config: &EngineConfig) -> Result<Self, TtsError> {
        let model = ModelId::new(config.model.as_str())?;
        let engine = SubprocessEngine::new(SubprocessEngineConfig::from(config));
        Ok(Self::new(Arc::new(engine), Some(model)))
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    /// 合成语音
    ///
    /// - voice 不在目录中时立即返回 `InvalidVoice`，不启动引擎
    /// - output_path 为非空路径时返回文件路径，否则返回音频字节
    pub async fn generate(
        &self,
        text: &str,
        voice: &str,
        output_path: Option<&Path>,
    ) -> Result<SynthesisResult, TtsError> {
        let voice = VoiceId::parse(voice).map_err(|e| {
            tracing::warn!(voice = %voice, "Rejected voice not in catalog");
            TtsError::from(e)
        })?;

        let request = match output_path.filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => SynthesisRequest::to_file(text, voice, self.model.clone(), path),
            None => SynthesisRequest::to_buffer(text, voice, self.model.clone()),
        };

        self.engine.synthesize(&request).await
    }

    /// 合成语音并写入文件，返回引擎报告的路径
    ///
    /// 目标目录必须已存在，这里不会创建
    pub async fn generate_to_file(
        &self,
        text: &str,
        output_path: &Path,
        voice: &str,
    ) -> Result<PathBuf, TtsError> {
        if output_path.as_os_str().is_empty() {
            return Err(TtsError::InvalidRequest(
                "output path cannot be empty".to_string(),
            ));
        }

        match self.generate(text, voice, Some(output_path)).await? {
            SynthesisResult::File { output_path } => Ok(output_path),
            SynthesisResult::Audio { .. } => Err(TtsError::ResponseParseError(
                "engine returned audio data for a file request".to_string(),
            )),
        }
    }

    /// 可用音色列表（每次返回新的副本）
    pub fn available_voices(&self) -> Vec<VoiceId> {
        VoiceId::ALL.to_vec()
    }

    /// 引擎及模型是否已正确安装
    pub async fn is_model_available(&self) -> bool {
        self.engine.check_available().await
    }

    /// 安装引擎依赖
    pub async fn install(&self) -> Result<InstallProgress, TtsError> {
        self.engine.install().await
    }
}
