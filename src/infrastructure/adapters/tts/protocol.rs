//! Engine Wire Protocol - 子进程参数与 stdout 消息格式
//!
//! argv: `<script> <command> [json]`
//!
//! generate 请求: `{"text", "voice", "model", "output_path": string|null}`
//! generate 响应（stdout 最后一行）: `{"output_path"}` | `{"audio_data"}` | `{"error"}`
//! install 进度: 每行一个 `{"status"}` 对象，非 JSON 行原样透传

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::ports::{InstallEvent, TtsError};
use crate::domain::synthesis::{OutputMode, SynthesisRequest, SynthesisResult};
use crate::domain::voice::VoiceId;

/// 引擎命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCommand {
    Generate,
    Check,
    Install,
}

impl EngineCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineCommand::Generate => "generate",
            EngineCommand::Check => "check",
            EngineCommand::Install => "install",
        }
    }
}

impl std::fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单次子进程调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// 被信号终止时为 None
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// generate 请求体 (JSON)
#[derive(Debug, Serialize)]
struct GenerateRequestDto<'a> {
    text: &'a str,
    voice: VoiceId,
    model: &'a str,
    output_path: Option<&'a Path>,
}

/// generate 响应体 (JSON)
#[derive(Debug, Deserialize)]
struct GenerateResponseDto {
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    audio_data: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// install 进度行 (JSON)
#[derive(Debug, Deserialize)]
struct InstallLineDto {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    success: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// 将请求编码为单个 JSON 参数
pub fn encode_request(request: &SynthesisRequest) -> Result<String, TtsError> {
    let dto = GenerateRequestDto {
        text: request.text(),
        voice: request.voice(),
        model: request.model().as_str(),
        output_path: request.output_path(),
    };

    serde_json::to_string(&dto).map_err(|e| TtsError::InvalidRequest(e.to_string()))
}

/// 解析 generate 调用的结果
///
/// 非零退出优先于 stdout 内容
pub fn decode_generate(
    outcome: &ProcessOutcome,
    mode: OutputMode,
) -> Result<SynthesisResult, TtsError> {
    if !outcome.success() {
        return Err(TtsError::EngineFailure {
            exit_code: outcome.exit_code,
            stderr: outcome.stderr.clone(),
        });
    }

    let line = trailing_line(&outcome.stdout).ok_or_else(|| {
        TtsError::ResponseParseError("engine produced no output".to_string())
    })?;

    let response: GenerateResponseDto = serde_json::from_str(line)
        .map_err(|e| TtsError::ResponseParseError(e.to_string()))?;

    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        return Err(TtsError::EngineReportedError(error));
    }

    match mode {
        OutputMode::File => {
            let output_path = response.output_path.ok_or_else(|| {
                TtsError::ResponseParseError("response is missing output_path".to_string())
            })?;
            Ok(SynthesisResult::File {
                output_path: PathBuf::from(output_path),
            })
        }
        OutputMode::Buffer => {
            let audio_data = response.audio_data.ok_or_else(|| {
                TtsError::ResponseParseError("response is missing audio_data".to_string())
            })?;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(audio_data.trim())
                .map_err(|e| TtsError::ResponseParseError(format!("invalid audio_data: {}", e)))?;
            Ok(SynthesisResult::Audio { bytes })
        }
    }
}

/// 解析 install 输出的一行，空行返回 None
pub fn parse_install_line(line: &str) -> Option<InstallEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let event = match serde_json::from_str::<InstallLineDto>(line) {
        Ok(InstallLineDto {
            status: Some(status),
            ..
        }) => InstallEvent::Status(status),
        Ok(InstallLineDto {
            error: Some(error), ..
        }) => InstallEvent::Error(error),
        Ok(InstallLineDto {
            success: Some(success),
            ..
        }) => InstallEvent::Success(success),
        _ => InstallEvent::Output(line.to_string()),
    };

    Some(event)
}

/// stdout 中最后一个非空行
fn trailing_line(stdout: &str) -> Option<&str> {
    stdout.lines().map(str::trim).rev().find(|l| !l.is_empty())
}
