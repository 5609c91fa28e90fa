//! Voice Context - 音色目录上下文
//!
//! 职责:
//! - 固定音色目录及成员校验
//! - 模型标识

mod errors;
mod value_objects;

pub use errors::VoiceError;
pub use value_objects::{ModelId, VoiceId};
