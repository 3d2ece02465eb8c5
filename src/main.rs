//! Salam command-line entry point

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use base64::Engine as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use salam_face::api::{ChatClient, ChatResponse, Scenario};
use salam_face::audio::playback::{Player, SpeakerPlayer};
use salam_face::audio::source::{AudioSource, Microphone};
use salam_face::audio::wav::{self, AudioClip};
use salam_face::config::{self, Config, Overrides};
use salam_face::{Result, app};

/// Voice-activated animated face for the Salam chat backend
#[derive(Parser)]
#[command(name = "salam", version, about)]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "SALAM_SERVER_URL", global = true)]
    server: Option<String>,

    /// Conversation scenario (studying | dialog)
    #[arg(long, env = "SALAM_SCENARIO", global = true)]
    scenario: Option<Scenario>,

    /// System prompt forwarded with every chat request
    #[arg(long, env = "SALAM_SYSTEM_PROMPT", global = true)]
    system_prompt: Option<String>,

    /// Config file path (defaults to ~/.config/salam/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the animated face (default)
    Run,

    /// Send a text message and print the reply
    Chat {
        /// Message text
        message: String,

        /// Skip playing the synthesized reply
        #[arg(long)]
        no_audio: bool,
    },

    /// Upload an existing WAV file as an audio chat turn
    Send {
        /// Path to a 16-bit PCM WAV file
        file: PathBuf,

        /// Skip playing the synthesized reply
        #[arg(long)]
        no_audio: bool,
    },

    /// Check backend health
    Health,

    /// Clear the server-side conversation history
    ClearHistory,

    /// Show a microphone level meter
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },

    /// Play a test tone through the speakers
    TestSpeaker,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,salam_face=info",
        1 => "info,salam_face=debug",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    // The face owns the terminal, so `run` logs to a file instead of stderr
    if matches!(cli.command, None | Some(Command::Run)) {
        match log_sink(config::log_file_path()) {
            LogSink::File(file) => tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .init(),
            LogSink::Stderr => tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(std::io::stderr)
                .init(),
        }
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

enum LogSink {
    File(std::fs::File),
    Stderr,
}

/// Open the log file for a TUI run, falling back to stderr when the
/// file cannot be created so log lines are never silently dropped
fn log_sink(path: Option<PathBuf>) -> LogSink {
    let Some(path) = path else {
        eprintln!("warning: no writable state directory, logging to stderr");
        return LogSink::Stderr;
    };
    match std::fs::File::create(&path) {
        Ok(file) => LogSink::File(file),
        Err(e) => {
            eprintln!("warning: cannot open {} ({e}), logging to stderr", path.display());
            LogSink::Stderr
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        server_url: cli.server,
        scenario: cli.scenario,
        system_prompt: cli.system_prompt,
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;

    match cli.command {
        None | Some(Command::Run) => app::run(config).await,
        Some(Command::Chat { message, no_audio }) => chat(&config, &message, no_audio).await,
        Some(Command::Send { file, no_audio }) => send(&config, &file, no_audio).await,
        Some(Command::Health) => health(&config).await,
        Some(Command::ClearHistory) => clear_history(&config).await,
        Some(Command::TestMic { duration }) => test_mic(duration, config.input_device).await,
        Some(Command::TestSpeaker) => test_speaker().await,
    }
}

async fn chat(config: &Config, message: &str, no_audio: bool) -> Result<()> {
    let client = ChatClient::new(&config.server_url)?;
    let response = client
        .chat(message, Some(config.scenario), config.system_prompt.as_deref())
        .await?;
    print_response(&response);
    if !no_audio {
        play_answer(response.audio_base64.as_deref()).await;
    }
    Ok(())
}

async fn send(config: &Config, file: &Path, no_audio: bool) -> Result<()> {
    let bytes = std::fs::read(file)?;
    println!("uploading {} ({} bytes)", file.display(), bytes.len());

    let client = ChatClient::new(&config.server_url)?;
    let response = client
        .chat_audio_request(bytes, Some(config.scenario), config.system_prompt.as_deref())
        .await?;
    print_response(&response);
    if !no_audio {
        play_answer(response.audio_base64.as_deref()).await;
    }
    Ok(())
}

async fn health(config: &Config) -> Result<()> {
    let client = ChatClient::new(&config.server_url)?;
    let health = client.health().await?;
    println!("status:  {}", health.status);
    println!("message: {}", health.message);
    println!("version: {}", health.version);
    Ok(())
}

async fn clear_history(config: &Config) -> Result<()> {
    let client = ChatClient::new(&config.server_url)?;
    client.clear_history_request().await?;
    println!("history cleared");
    Ok(())
}

fn print_response(response: &ChatResponse) {
    if let Some(recognized) = &response.recognized_tat {
        println!("recognized:   {recognized}");
    }
    if let Some(input) = &response.input_tat {
        println!("input:        {input}");
    }
    println!("translated:   {}", response.translated_to_ru);
    println!("answer:       {}", response.model_answer_ru);
    if let Some(back) = &response.translated_back_to_tat {
        println!("answer (tat): {back}");
    }
}

/// Best-effort playback of a base64 WAV reply
async fn play_answer(encoded: Option<&str>) {
    let Some(encoded) = encoded else { return };

    let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(encoded) else {
        eprintln!("(response audio was not valid base64)");
        return;
    };
    match wav::decode(&bytes) {
        Ok(clip) => {
            if let Err(e) = SpeakerPlayer.play(clip).await {
                eprintln!("(audio playback failed: {e})");
            }
        }
        Err(e) => eprintln!("(response audio unusable: {e})"),
    }
}

async fn test_mic(duration: u64, device: Option<String>) -> Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut source = Microphone::new(device);
    let mut frames = source.start().await?;
    println!("---");

    for second in 1..=duration {
        let mut samples: Vec<f32> = Vec::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            match tokio::time::timeout_at(deadline, frames.recv()).await {
                Ok(Some(frame)) => samples.extend(frame.samples),
                Ok(None) | Err(_) => break,
            }
        }

        let energy = rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter = "█".repeat(meter_len) + &"░".repeat(50 - meter_len);
        println!("[{second:2}s] RMS: {energy:.4} | Peak: {peak:.4} | {meter}");
    }

    source.stop().await;
    println!("---");
    println!("\nIf you saw movement in the meter, your mic is working!");
    Ok(())
}

async fn test_speaker() -> Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440 Hz tone for 2 seconds\n");

    let sample_rate: u32 = 24_000;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.3
        })
        .collect();

    SpeakerPlayer
        .play(AudioClip {
            samples,
            sample_rate,
            channels: 1,
        })
        .await?;

    println!("If you heard the tone, your speakers are working!");
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}
