//! Subprocess Engine - 通过子进程调用外部 TTS 引擎
//!
//! 实现 SpeechEnginePort trait，每次调用启动一个独立进程:
//! `<interpreter> <script> <command> [json]`
//!
//! stdout/stderr 在进程运行期间持续读取，进程退出后才解析。
//! 默认不限制并发、不设超时，两者均可通过配置开启。

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use super::protocol::{self, EngineCommand, ProcessOutcome};
use crate::application::ports::{InstallEvent, InstallProgress, SpeechEnginePort, TtsError};
use crate::config::EngineConfig;
use crate::domain::synthesis::{InvocationId, SynthesisRequest, SynthesisResult};

/// install 事件缓冲
const INSTALL_EVENT_BUFFER: usize = 64;

/// 子进程引擎配置
#[derive(Debug, Clone)]
pub struct SubprocessEngineConfig {
    /// 解释器，如 `python3`
    pub interpreter: String,
    /// 引擎入口脚本
    pub script: PathBuf,
    /// 单次调用超时，None 表示无限等待（install 不受此限制）
    pub timeout: Option<Duration>,
    /// 最大并发子进程数，None 表示不限制
    pub max_concurrent: Option<usize>,
}

impl From<&EngineConfig> for SubprocessEngineConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            interpreter: config.interpreter.clone(),
            script: config.script.clone(),
            timeout: config.timeout(),
            max_concurrent: config.concurrency_limit(),
        }
    }
}

impl SubprocessEngineConfig {
    pub fn new(interpreter: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            script: script.into(),
            timeout: None,
            max_concurrent: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = Some(max_concurrent);
        self
    }
}

/// 子进程引擎
pub struct SubprocessEngine {
    config: SubprocessEngineConfig,
    limiter: Option<Arc<Semaphore>>,
}

impl SubprocessEngine {
    pub fn new(config: SubprocessEngineConfig) -> Self {
        let limiter = config
            .max_concurrent
            .map(|n| Arc::new(Semaphore::new(n.max(1))));
        Self { config, limiter }
    }

    /// 确认解释器可用（`<interpreter> --version`）
    ///
    /// 在任何引擎调用之前执行，失败返回 `SetupError`
    pub async fn ensure_interpreter(&self) -> Result<(), TtsError> {
        let interpreter = &self.config.interpreter;
        let status = Command::new(interpreter)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                TtsError::SetupError(format!(
                    "{} is required but was not found in PATH ({})",
                    interpreter, e
                ))
            })?;

        if !status.success() {
            return Err(TtsError::SetupError(format!(
                "{} --version exited with {}",
                interpreter, status
            )));
        }

        tracing::debug!(interpreter = %interpreter, "Interpreter available");
        Ok(())
    }

    fn command(&self, command: EngineCommand, payload: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.config.interpreter);
        cmd.arg(&self.config.script).arg(command.as_str());
        if let Some(payload) = payload {
            cmd.arg(payload);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.limiter {
            Some(semaphore) => semaphore.clone().acquire_owned().await.ok(),
            None => None,
        }
    }

    fn spawn_error(&self, err: std::io::Error) -> TtsError {
        if err.kind() == ErrorKind::NotFound {
            TtsError::SetupError(format!(
                "Interpreter '{}' not found in PATH",
                self.config.interpreter
            ))
        } else {
            TtsError::IoError(format!("Failed to spawn engine process: {}", err))
        }
    }

    /// 启动一次引擎进程并等待其退出
    pub async fn run(
        &self,
        command: EngineCommand,
        payload: Option<&str>,
    ) -> Result<ProcessOutcome, TtsError> {
        let _permit = self.acquire().await;
        let invocation = InvocationId::new();

        tracing::debug!(
            invocation = %invocation,
            command = %command,
            interpreter = %self.config.interpreter,
            script = %self.config.script.display(),
            "Spawning engine process"
        );

        let child = self
            .command(command, payload)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // 超时后 future 被丢弃，kill_on_drop 负责终止子进程
        let output = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| {
                    tracing::warn!(
                        invocation = %invocation,
                        command = %command,
                        timeout_secs = timeout.as_secs(),
                        "Engine process timed out, killed"
                    );
                    TtsError::Timeout {
                        secs: timeout.as_secs(),
                    }
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| TtsError::IoError(format!("Failed to wait for engine process: {}", e)))?;

        let outcome = ProcessOutcome {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        tracing::debug!(
            invocation = %invocation,
            command = %command,
            exit_code = ?outcome.exit_code,
            stdout_len = outcome.stdout.len(),
            stderr_len = outcome.stderr.len(),
            "Engine process exited"
        );

        Ok(outcome)
    }
}

#[async_trait]
impl SpeechEnginePort for SubprocessEngine {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<SynthesisResult, TtsError> {
        let payload = protocol::encode_request(request)?;

        tracing::debug!(
            voice = %request.voice(),
            model = %request.model(),
            text_len = request.text().len(),
            mode = ?request.mode(),
            "Sending generate request"
        );

        let outcome = self.run(EngineCommand::Generate, Some(&payload)).await?;

        match protocol::decode_generate(&outcome, request.mode()) {
            Ok(result) => {
                match &result {
                    SynthesisResult::File { output_path } => tracing::info!(
                        voice = %request.voice(),
                        output_path = %output_path.display(),
                        "Synthesis completed"
                    ),
                    SynthesisResult::Audio { bytes } => tracing::info!(
                        voice = %request.voice(),
                        audio_size = bytes.len(),
                        "Synthesis completed"
                    ),
                }
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(voice = %request.voice(), error = %e, "Synthesis failed");
                Err(e)
            }
        }
    }

    async fn check_available(&self) -> bool {
        match self.run(EngineCommand::Check, None).await {
            Ok(outcome) => {
                tracing::debug!(exit_code = ?outcome.exit_code, "Engine check finished");
                outcome.success()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Engine check could not run");
                false
            }
        }
    }

    async fn install(&self) -> Result<InstallProgress, TtsError> {
        let permit = self.acquire().await;

        tracing::info!(
            interpreter = %self.config.interpreter,
            script = %self.config.script.display(),
            "Starting engine install"
        );

        let mut child = self
            .command(EngineCommand::Install, None)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TtsError::IoError("Engine stdout is unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TtsError::IoError("Engine stderr is unavailable".to_string()))?;

        let (tx, rx) = mpsc::channel(INSTALL_EVENT_BUFFER);
        let stderr_tx = tx.clone();

        let completion = tokio::spawn(async move {
            let _permit = permit;

            let stderr_task = tokio::spawn(async move {
                let mut collected = String::new();
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    collected.push_str(&line);
                    collected.push('\n');
                    // 接收端已关闭时继续读取，避免管道写满阻塞子进程
                    let _ = stderr_tx.send(InstallEvent::Diagnostic(line)).await;
                }
                collected
            });

            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if let Some(event) = protocol::parse_install_line(&line) {
                            let _ = tx.send(event).await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed reading engine stdout");
                        break;
                    }
                }
            }
            drop(tx);

            let status = child
                .wait()
                .await
                .map_err(|e| TtsError::IoError(format!("Failed to wait for engine: {}", e)))?;

            let stderr = match stderr_task.await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed collecting engine stderr");
                    String::new()
                }
            };

            if status.success() {
                tracing::info!("Engine install completed");
                Ok(())
            } else {
                tracing::error!(exit_code = ?status.code(), "Engine install failed");
                Err(TtsError::EngineFailure {
                    exit_code: status.code(),
                    stderr,
                })
            }
        });

        Ok(InstallProgress::new(rx, completion))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::voice::{ModelId, VoiceId};
    use futures_util::StreamExt;
    use std::path::Path;
    use tempfile::TempDir;

    /// 在临时目录写入一个 sh 桩引擎
    fn stub_engine(body: &str) -> (TempDir, SubprocessEngineConfig) {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("engine.sh");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let config = SubprocessEngineConfig::new("sh", script);
        (dir, config)
    }

    fn buffer_request() -> SynthesisRequest {
        SynthesisRequest::to_buffer("Hello", VoiceId::Voice2Female, ModelId::default())
    }

    #[tokio::test]
    async fn test_generate_decodes_audio_data() {
        let (_dir, config) = stub_engine(r#"printf '{"audio_data":"AAAA"}\n'"#);
        let engine = SubprocessEngine::new(config);

        let result = engine.synthesize(&buffer_request()).await.unwrap();
        assert_eq!(result, SynthesisResult::Audio { bytes: vec![0, 0, 0] });
    }

    #[tokio::test]
    async fn test_generate_passes_command_and_json_argument() {
        let dir = tempfile::tempdir().unwrap();
        let args_file = dir.path().join("args.txt");
        let (_stub_dir, config) = stub_engine(&format!(
            "printf '%s\\n%s\\n' \"$1\" \"$2\" > '{}'\nprintf '{{\"audio_data\":\"\"}}\\n'",
            args_file.display()
        ));
        let engine = SubprocessEngine::new(config);

        engine.synthesize(&buffer_request()).await.unwrap();

        let recorded = std::fs::read_to_string(&args_file).unwrap();
        let mut lines = recorded.lines();
        assert_eq!(lines.next(), Some("generate"));
        let json: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(json["text"], "Hello");
        assert_eq!(json["voice"], "expr-voice-2-f");
        assert_eq!(json["model"], "KittenML/kitten-tts-nano-0.2");
        assert!(json["output_path"].is_null());
    }

    #[tokio::test]
    async fn test_generate_to_file_returns_reported_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hello.wav");
        let (_stub_dir, config) = stub_engine(&format!(
            "printf 'RIFF' > '{path}'\nprintf '{{\"output_path\":\"{path}\"}}\\n'",
            path = out.display()
        ));
        let engine = SubprocessEngine::new(config);

        let request =
            SynthesisRequest::to_file("Hello", VoiceId::Voice3Male, ModelId::default(), &out);
        let result = engine.synthesize(&request).await.unwrap();

        assert_eq!(
            result,
            SynthesisResult::File {
                output_path: out.clone()
            }
        );
        assert!(out.exists());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_engine_failure_with_stderr() {
        let (_dir, config) = stub_engine("echo 'No module named kittentts' >&2\nexit 3");
        let engine = SubprocessEngine::new(config);

        let err = engine.synthesize(&buffer_request()).await.unwrap_err();
        match err {
            TtsError::EngineFailure { exit_code, stderr } => {
                assert_eq!(exit_code, Some(3));
                assert_eq!(stderr, "No module named kittentts\n");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_json_is_parse_error() {
        let (_dir, config) = stub_engine("echo 'this is not json'");
        let engine = SubprocessEngine::new(config);

        let err = engine.synthesize(&buffer_request()).await.unwrap_err();
        assert!(matches!(err, TtsError::ResponseParseError(_)));
    }

    #[tokio::test]
    async fn test_reported_error() {
        let (_dir, config) = stub_engine(r#"printf '{"error":"voice model missing"}\n'"#);
        let engine = SubprocessEngine::new(config);

        let err = engine.synthesize(&buffer_request()).await.unwrap_err();
        assert!(matches!(err, TtsError::EngineReportedError(ref m) if m == "voice model missing"));
    }

    #[tokio::test]
    async fn test_check_maps_exit_code() {
        let (_dir, config) = stub_engine("[ \"$1\" = check ] && exit 0\nexit 1");
        assert!(SubprocessEngine::new(config).check_available().await);

        let (_dir, config) = stub_engine("exit 1");
        assert!(!SubprocessEngine::new(config).check_available().await);
    }

    #[tokio::test]
    async fn test_missing_interpreter() {
        let config = SubprocessEngineConfig::new(
            "kitten-bridge-no-such-interpreter",
            Path::new("python-bridge.py"),
        );
        let engine = SubprocessEngine::new(config);

        assert!(!engine.check_available().await);
        assert!(matches!(
            engine.ensure_interpreter().await,
            Err(TtsError::SetupError(_))
        ));
        assert!(matches!(
            engine.synthesize(&buffer_request()).await,
            Err(TtsError::SetupError(_))
        ));
    }

    #[tokio::test]
    async fn test_ensure_interpreter_probe_succeeds() {
        // dash 不支持 --version，改用总是成功的 true
        let engine = SubprocessEngine::new(SubprocessEngineConfig::new("true", "unused"));
        assert!(engine.ensure_interpreter().await.is_ok());
    }

    #[tokio::test]
    async fn test_timeout_kills_engine() {
        let (_dir, config) = stub_engine("exec sleep 5");
        let engine = SubprocessEngine::new(config.with_timeout(Duration::from_millis(200)));

        let started = std::time::Instant::now();
        let err = engine.synthesize(&buffer_request()).await.unwrap_err();
        assert!(matches!(err, TtsError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_concurrency_limit_serializes_processes() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("running");
        let (_stub_dir, config) = stub_engine(&format!(
            "if [ -e '{lock}' ]; then echo overlap >&2; exit 9; fi\n\
             touch '{lock}'\nsleep 0.2\nrm '{lock}'\n\
             printf '{{\"audio_data\":\"AAAA\"}}\\n'",
            lock = lock.display()
        ));
        let engine = Arc::new(SubprocessEngine::new(config.with_max_concurrent(1)));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.synthesize(&buffer_request()).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
    }

    #[tokio::test]
    async fn test_install_streams_status_lines() {
        let (_dir, config) = stub_engine(
            "[ \"$1\" = install ] || exit 2\n\
             echo '{\"status\": \"Installing KittenTTS wheel...\"}'\n\
             echo 'Collecting kittentts'\n\
             echo '{\"status\": \"Installation completed successfully\"}'\n\
             echo '{\"success\": \"KittenTTS installed successfully\"}'",
        );
        let engine = SubprocessEngine::new(config);

        let mut progress = engine.install().await.unwrap();
        let mut events = Vec::new();
        while let Some(event) = progress.next().await {
            events.push(event);
        }
        progress.finish().await.unwrap();

        assert_eq!(
            events,
            vec![
                InstallEvent::Status("Installing KittenTTS wheel...".to_string()),
                InstallEvent::Output("Collecting kittentts".to_string()),
                InstallEvent::Status("Installation completed successfully".to_string()),
                InstallEvent::Success("KittenTTS installed successfully".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_install_failure() {
        let (_dir, config) = stub_engine("echo 'pip: network unreachable' >&2\nexit 1");
        let engine = SubprocessEngine::new(config);

        let mut progress = engine.install().await.unwrap();
        let mut diagnostics = Vec::new();
        while let Some(event) = progress.next().await {
            if let InstallEvent::Diagnostic(line) = event {
                diagnostics.push(line);
            }
        }
        let err = progress.finish().await.unwrap_err();

        assert_eq!(diagnostics, vec!["pip: network unreachable".to_string()]);
        assert!(matches!(err, TtsError::EngineFailure { exit_code: Some(1), .. }));
    }
}
