//! Synthesis Context - Value Objects

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::domain::voice::{ModelId, VoiceId};

/// 单次引擎调用的追踪 ID（只用于日志关联）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvocationId(Uuid);

impl InvocationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for InvocationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 输出模式
///
/// 由调用方是否提供 output_path 唯一决定，引擎的响应结构必须与之匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// 引擎写文件，返回路径
    File,
    /// 引擎返回 base64 编码的音频
    Buffer,
}

/// 合成请求
///
/// 每次调用构造一次，发送给引擎后即丢弃。
/// text 不做长度/内容校验，交由外部引擎处理。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    text: String,
    voice: VoiceId,
    model: ModelId,
    output_path: Option<PathBuf>,
}

impl SynthesisRequest {
    /// 返回内存音频的请求
    pub fn to_buffer(text: impl Into<String>, voice: VoiceId, model: ModelId) -> Self {
        Self {
            text: text.into(),
            voice,
            model,
            output_path: None,
        }
    }

    /// 写入文件的请求
    pub fn to_file(
        text: impl Into<String>,
        voice: VoiceId,
        model: ModelId,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            text: text.into(),
            voice,
            model,
            output_path: Some(output_path.into()),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn voice(&self) -> VoiceId {
        self.voice
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    pub fn mode(&self) -> OutputMode {
        if self.output_path.is_some() {
            OutputMode::File
        } else {
            OutputMode::Buffer
        }
    }
}

/// 合成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisResult {
    /// 引擎报告的输出路径（通常与请求路径一致，但以引擎为准）
    File { output_path: PathBuf },
    /// 解码后的音频字节（WAV）
    Audio { bytes: Vec<u8> },
}

impl SynthesisResult {
    pub fn mode(&self) -> OutputMode {
        match self {
            Self::File { .. } => OutputMode::File,
            Self::Audio { .. } => OutputMode::Buffer,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Self::File { output_path } => Some(output_path),
            Self::Audio { .. } => None,
        }
    }

    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            Self::Audio { bytes } => Some(bytes),
            Self::File { .. } => None,
        }
    }
}
