//! Voice Context - Errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("Invalid voice '{voice}'. Available voices: {available}")]
    InvalidVoice { voice: String, available: String },

    #[error("Invalid model: {0}")]
    InvalidModel(String),
}
