//! TTS Adapter - 外部引擎适配器实现

mod fake_engine;
mod protocol;
mod subprocess_engine;

pub use fake_engine::{FakeSpeechEngine, FakeSpeechEngineConfig};
pub use protocol::{EngineCommand, ProcessOutcome};
pub use subprocess_engine::*;
