//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Voice Context: 固定音色目录、模型标识
//! - Synthesis Context: 合成请求与结果

pub mod synthesis;
pub mod voice;
