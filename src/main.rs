//! kitten-bridge - 外部 TTS 引擎命令行
//!
//! 子命令:
//! - voices: 列出音色
//! - check: 检查引擎是否可用
//! - install: 安装引擎依赖
//! - generate: 合成语音
//! - demo: 生成一组示例文件

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures_util::StreamExt;

use kitten_bridge::config::{load_config_from_path, print_config, LogConfig};
use kitten_bridge::infrastructure::adapters::{
    inspect_wav, SubprocessEngine, SubprocessEngineConfig,
};
use kitten_bridge::{InstallEvent, SynthesisResult, TtsClient, VoiceId};

/// 示例文本、音色、文件名
const DEMO_SAMPLES: &[(&str, VoiceId, &str)] = &[
    (
        "Hello! This is a test of the KittenTTS bridge.",
        VoiceId::Voice2Female,
        "hello-female.wav",
    ),
    (
        "This high quality text-to-speech model works without a GPU.",
        VoiceId::Voice3Male,
        "demo-male.wav",
    ),
    (
        "Rust and Python working together seamlessly!",
        VoiceId::Voice4Female,
        "seamless-female.wav",
    ),
];

/// Command-line bridge to the external KittenTTS engine
#[derive(Parser)]
#[command(name = "kitten-bridge")]
#[command(version)]
#[command(about = "Run the external KittenTTS engine from the command line", long_about = None)]
struct Cli {
    /// Configuration file (defaults to config.toml / config.local.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available voices
    Voices,

    /// Check whether the engine and its model are installed
    Check,

    /// Install the engine's dependencies
    Install,

    /// Convert text to speech
    Generate {
        /// Text to speak
        text: String,
        /// Voice to use
        #[arg(short, long, default_value = "expr-voice-2-f")]
        voice: String,
        /// Write the audio to this file (its directory must exist)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Write raw audio bytes to stdout
        #[arg(long, conflicts_with = "output")]
        raw: bool,
    },

    /// Generate a few sample files
    Demo {
        /// Directory for the generated files
        #[arg(short, long, default_value = "samples")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config_from_path(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config.log);
    print_config(&config);

    let client = TtsClient::from_config(&config.engine)?;

    match cli.command {
        Commands::Voices => {
            for (index, voice) in client.available_voices().iter().enumerate() {
                println!("  {}. {}", index + 1, voice);
            }
        }

        Commands::Check => {
            if !client.is_model_available().await {
                anyhow::bail!(
                    "TTS model is not available. \
                     Run `kitten-bridge install` to install the engine's dependencies."
                );
            }
            println!("Model is ready");
        }

        Commands::Install => {
            let engine = SubprocessEngine::new(SubprocessEngineConfig::from(&config.engine));
            engine.ensure_interpreter().await.with_context(|| {
                format!("Please install {} and try again", config.engine.interpreter)
            })?;
            install(&client).await?;
        }

        Commands::Generate {
            text,
            voice,
            output,
            raw,
        } => match output {
            Some(path) => {
                let saved = client.generate_to_file(&text, &path, &voice).await?;
                println!("Saved: {}", saved.display());
            }
            None => {
                let result = client.generate(&text, &voice, None).await?;
                let SynthesisResult::Audio { bytes } = result else {
                    anyhow::bail!("Engine returned a file path for an in-memory request");
                };
                if raw {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                } else {
                    describe_audio(&bytes);
                }
            }
        },

        Commands::Demo { dir } => demo(&client, &dir).await?,
    }

    Ok(())
}

/// 初始化日志（输出到 stderr，stdout 留给命令结果）
fn init_tracing(log: &LogConfig) {
    let log_filter = format!("warn,kitten_bridge={}", log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if log.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn install(client: &TtsClient) -> anyhow::Result<()> {
    println!("Installing KittenTTS dependencies...");

    let mut progress = client.install().await?;
    while let Some(event) = progress.next().await {
        match event {
            InstallEvent::Status(status) => println!("📦 {}", status),
            InstallEvent::Success(message) => println!("{}", message),
            InstallEvent::Error(message) => eprintln!("{}", message),
            InstallEvent::Output(line) => println!("{}", line),
            InstallEvent::Diagnostic(line) => eprintln!("{}", line),
        }
    }

    progress
        .finish()
        .await
        .context("Failed to install KittenTTS dependencies")?;

    println!("KittenTTS is ready to use!");
    Ok(())
}

fn describe_audio(bytes: &[u8]) {
    match inspect_wav(bytes) {
        Ok(info) => println!(
            "Generated {} bytes of audio ({} ms, {} Hz, {} channel(s), {}-bit)",
            bytes.len(),
            info.duration_ms,
            info.sample_rate,
            info.channels,
            info.bits_per_sample
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Engine audio is not a WAV stream");
            println!("Generated {} bytes of audio", bytes.len());
        }
    }
}

async fn demo(client: &TtsClient, dir: &Path) -> anyhow::Result<()> {
    if !client.is_model_available().await {
        anyhow::bail!(
            "TTS model is not available. Please ensure the engine's dependencies are installed."
        );
    }
    println!("Model is ready!");

    println!("\nAvailable voices:");
    for (index, voice) in client.available_voices().iter().enumerate() {
        println!("  {}. {}", index + 1, voice);
    }

    // 输出目录由调用方负责创建
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    println!("\nGenerating speech samples...");
    for (text, voice, filename) in DEMO_SAMPLES {
        println!("\nText: \"{}\"", text);
        println!("Voice: {}", voice);

        let path = dir.join(filename);
        let saved = client.generate_to_file(text, &path, voice.as_str()).await?;
        println!("Saved: {}", saved.display());
    }

    println!("\nAll samples generated in {}", dir.display());
    Ok(())
}
