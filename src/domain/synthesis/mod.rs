//! Synthesis Context - 合成请求/结果

mod value_objects;

pub use value_objects::{InvocationId, OutputMode, SynthesisRequest, SynthesisResult};
