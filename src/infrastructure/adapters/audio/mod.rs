//! Audio Adapter - 音频元信息

mod wav_info;

pub use wav_info::{inspect_wav, AudioError, AudioInfo};
