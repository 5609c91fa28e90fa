//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（SpeechEngine）
//! - tts_client: 面向调用方的桥接客户端

pub mod ports;
mod tts_client;

pub use ports::{InstallEvent, InstallProgress, SpeechEnginePort, TtsError};
pub use tts_client::TtsClient;
