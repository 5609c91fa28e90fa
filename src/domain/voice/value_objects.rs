//! Voice Context - Value Objects

use serde::{Deserialize, Serialize};

use super::VoiceError;

/// 引擎支持的音色标识
///
/// 封闭集合，共 8 个，命名规则 `expr-voice-<group>-<gender>`。
/// 运行时不可新增，只做成员校验。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoiceId {
    #[serde(rename = "expr-voice-2-m")]
    Voice2Male,
    #[serde(rename = "expr-voice-2-f")]
    Voice2Female,
    #[serde(rename = "expr-voice-3-m")]
    Voice3Male,
    #[serde(rename = "expr-voice-3-f")]
    Voice3Female,
    #[serde(rename = "expr-voice-4-m")]
    Voice4Male,
    #[serde(rename = "expr-voice-4-f")]
    Voice4Female,
    #[serde(rename = "expr-voice-5-m")]
    Voice5Male,
    #[serde(rename = "expr-voice-5-f")]
    Voice5Female,
}

impl VoiceId {
    /// 完整音色目录（顺序固定）
    pub const ALL: [VoiceId; 8] = [
        VoiceId::Voice2Male,
        VoiceId::Voice2Female,
        VoiceId::Voice3Male,
        VoiceId::Voice3Female,
        VoiceId::Voice4Male,
        VoiceId::Voice4Female,
        VoiceId::Voice5Male,
        VoiceId::Voice5Female,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voice2Male => "expr-voice-2-m",
            Self::Voice2Female => "expr-voice-2-f",
            Self::Voice3Male => "expr-voice-3-m",
            Self::Voice3Female => "expr-voice-3-f",
            Self::Voice4Male => "expr-voice-4-m",
            Self::Voice4Female => "expr-voice-4-f",
            Self::Voice5Male => "expr-voice-5-m",
            Self::Voice5Female => "expr-voice-5-f",
        }
    }

    /// 校验并解析音色字符串
    pub fn parse(voice: &str) -> Result<Self, VoiceError> {
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == voice)
            .ok_or_else(|| VoiceError::InvalidVoice {
                voice: voice.to_string(),
                available: Self::catalog_list(),
            })
    }

    /// 逗号分隔的目录字符串（用于错误提示）
    pub fn catalog_list() -> String {
        Self::ALL
            .iter()
            .map(VoiceId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for VoiceId {
    fn default() -> Self {
        Self::Voice2Female
    }
}

impl std::fmt::Display for VoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for VoiceId {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// 外部模型标识（如 `KittenML/kitten-tts-nano-0.2`）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    pub const DEFAULT: &'static str = "KittenML/kitten-tts-nano-0.2";

    pub fn new(model: impl Into<String>) -> Result<Self, VoiceError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(VoiceError::InvalidModel(
                "model identifier cannot be empty".to_string(),
            ));
        }
        Ok(Self(model))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order() {
        let names: Vec<&str> = VoiceId::ALL.iter().map(VoiceId::as_str).collect();
        assert_eq!(
            names,
            vec![
                "expr-voice-2-m",
                "expr-voice-2-f",
                "expr-voice-3-m",
                "expr-voice-3-f",
                "expr-voice-4-m",
                "expr-voice-4-f",
                "expr-voice-5-m",
                "expr-voice-5-f",
            ]
        );
    }

    #[test]
    fn test_parse_every_catalog_entry() {
        for voice in VoiceId::ALL {
            assert_eq!(VoiceId::parse(voice.as_str()).unwrap(), voice);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_voice() {
        let err = VoiceId::parse("bogus-voice").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Invalid voice"));
        for voice in VoiceId::ALL {
            assert!(message.contains(voice.as_str()), "missing {}", voice);
        }
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!(VoiceId::parse("EXPR-VOICE-2-F").is_err());
        assert!(VoiceId::parse(" expr-voice-2-f").is_err());
    }

    #[test]
    fn test_default_voice() {
        assert_eq!(VoiceId::default().as_str(), "expr-voice-2-f");
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&VoiceId::Voice4Male).unwrap();
        assert_eq!(json, "\"expr-voice-4-m\"");
    }

    #[test]
    fn test_model_id_validation() {
        assert!(ModelId::new("").is_err());
        assert!(ModelId::new("   ").is_err());
        assert_eq!(ModelId::new("custom/model").unwrap().as_str(), "custom/model");
        assert_eq!(ModelId::default().as_str(), "KittenML/kitten-tts-nano-0.2");
    }
}
