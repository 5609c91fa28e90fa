//! Kitten Bridge - 外部 TTS 引擎的进程桥接
//!
//! 通过子进程调用独立安装的 TTS 推理引擎：编码请求、启动进程、
//! 收集 stdout/stderr、解释退出码并解码响应（文件路径或 base64 音频）。
//! 声学模型与推理完全由外部程序负责。
//!
//! 领域层 (domain/):
//! - Voice Context: 固定音色目录、模型标识
//! - Synthesis Context: 合成请求与结果
//!
//! 应用层 (application/):
//! - Ports: SpeechEnginePort
//! - TtsClient: generate / generate_to_file / available_voices / is_model_available
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: SubprocessEngine、FakeSpeechEngine、WAV 头解析

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{InstallEvent, InstallProgress, SpeechEnginePort, TtsClient, TtsError};
pub use config::AppConfig;
pub use domain::synthesis::{SynthesisRequest, SynthesisResult};
pub use domain::voice::{ModelId, VoiceId};
