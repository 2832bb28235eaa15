//! Composition root: builds the pipeline from configuration and drives it
//! for each CLI command.

use crate::artifact::ArtifactLifecycleManager;
use crate::chat::gemini::GeminiChat;
use crate::chat::history::Session;
use crate::chat::model::ChatModel;
use crate::config::Config;
use crate::error::{PolyvoxError, Result};
use crate::pipeline::{Exchange, InputPayload, Pipeline};
use crate::stt::transcriber::SpeechTranscriber;
use crate::tts::google::GoogleTranslateSynthesizer;
use crate::tts::synthesizer::SpeechSynthesizer;
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

/// Behavior switches shared by all commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub quiet: bool,
    pub no_audio: bool,
}

fn resolve_api_key(config: &Config) -> Result<String> {
    config
        .chat
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| PolyvoxError::ConfigInvalidValue {
            key: "chat.api_key".to_string(),
            message: "set it in the config file or the POLYVOX_API_KEY / GEMINI_API_KEY \
                      environment variable"
                .to_string(),
        })
}

#[cfg(feature = "whisper")]
fn build_transcriber(config: &Config) -> Result<Arc<dyn SpeechTranscriber>> {
    use crate::stt::whisper::{WhisperConfig, WhisperTranscriber};

    let model_path =
        config
            .stt
            .model_path
            .clone()
            .ok_or_else(|| PolyvoxError::ConfigInvalidValue {
                key: "stt.model_path".to_string(),
                message: "audio input needs a Whisper model file".to_string(),
            })?;
    let transcriber = WhisperTranscriber::new(WhisperConfig {
        model_path,
        language: config.stt.language.clone(),
        threads: config.stt.threads,
    })?;
    Ok(Arc::new(transcriber))
}

#[cfg(not(feature = "whisper"))]
fn build_transcriber(_config: &Config) -> Result<Arc<dyn SpeechTranscriber>> {
    use crate::stt::transcriber::UnavailableTranscriber;
    Ok(Arc::new(UnavailableTranscriber))
}

/// Build the full pipeline from configuration.
pub fn build_pipeline(config: &Config, opts: RunOptions) -> Result<Pipeline> {
    let api_key = resolve_api_key(config)?;
    let model: Arc<dyn ChatModel> = Arc::new(GeminiChat::new(
        api_key,
        Some(&config.chat.model),
        Some(&config.chat.base_url),
    ));

    let synthesizer: Option<Arc<dyn SpeechSynthesizer>> =
        if config.synthesis.enabled && !opts.no_audio {
            Some(Arc::new(GoogleTranslateSynthesizer::new(
                config.synthesis.endpoint.as_deref(),
            )))
        } else {
            None
        };

    let transcriber = build_transcriber(config)?;

    let endpoint_config = crate::audio::endpoint::EndPointConfig {
        speech_threshold: config.audio.speech_threshold,
        trailing_silence_ms: config.audio.trailing_silence_ms,
        ..Default::default()
    };

    Ok(
        Pipeline::new(transcriber, model, synthesizer, config.limits.clone())
            .with_endpoint_config(endpoint_config),
    )
}

/// Print the answer and deliver its audio, then release the artifact.
fn present(exchange: &Exchange, artifacts: &ArtifactLifecycleManager, config: &Config, opts: RunOptions) {
    if opts.quiet {
        println!("{}", exchange.answer.text);
    } else {
        println!("{}", "Answer:".green().bold());
        println!("{}", exchange.answer.text);
    }

    let Some(playback) = exchange.playback else {
        return;
    };

    let result = deliver_audio(playback, artifacts, config, opts);
    artifacts.release(playback.artifact);
    if let Err(e) = result {
        // Audio delivery is best effort; the answer text was already shown
        tracing::warn!(error = %e, "audio delivery failed");
    }
}

fn deliver_audio(
    playback: crate::tts::router::PlaybackHandle,
    artifacts: &ArtifactLifecycleManager,
    config: &Config,
    opts: RunOptions,
) -> Result<()> {
    let bytes = artifacts.bytes(playback.artifact)?;
    artifacts.mark_delivered(playback.artifact);

    let path = std::env::temp_dir().join(format!(
        "polyvox-{}.{}",
        uuid::Uuid::new_v4().simple(),
        playback.format.extension()
    ));
    std::fs::write(&path, &bytes)?;

    match config.synthesis.player.as_deref() {
        Some(player) => {
            let status = std::process::Command::new(player).arg(&path).status()?;
            if !status.success() {
                tracing::warn!(player, %status, "audio player exited with failure");
            }
            let _ = std::fs::remove_file(&path);
        }
        None => {
            if !opts.quiet {
                println!("{} {}", "Audio:".dimmed(), path.display());
            }
        }
    }
    Ok(())
}

fn report(err: &PolyvoxError) {
    if err.is_recoverable() {
        eprintln!("{} {err}", "!".yellow().bold());
    } else {
        eprintln!("{} {err}", "error:".red().bold());
    }
}

/// Ask a single typed question.
pub async fn run_ask(config: Config, text: String, opts: RunOptions) -> Result<()> {
    let pipeline = build_pipeline(&config, opts)?;
    let mut session = Session::new();

    let exchange = pipeline
        .handle(&mut session, InputPayload::Typed(text))
        .await?;
    present(&exchange, pipeline.artifacts(), &config, opts);
    Ok(())
}

/// Interactive conversation loop. Each line is a question; the session
/// carries history so follow-ups resolve against earlier answers.
pub async fn run_chat(config: Config, opts: RunOptions) -> Result<()> {
    let pipeline = build_pipeline(&config, opts)?;
    let mut session = Session::new();

    if !opts.quiet {
        println!(
            "{}",
            "Type a question in any supported language. Empty line exits.".dimmed()
        );
    }

    let stdin = std::io::stdin();
    loop {
        if !opts.quiet {
            print!("{} ", ">".cyan().bold());
            let _ = std::io::stdout().flush();
        }
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        match pipeline
            .handle(&mut session, InputPayload::Typed(line.to_string()))
            .await
        {
            Ok(exchange) => present(&exchange, pipeline.artifacts(), &config, opts),
            // Recoverable failures leave the session ready for the next turn
            Err(e) => report(&e),
        }
    }
    Ok(())
}

/// Ask with an uploaded audio file.
pub async fn run_upload(config: Config, path: &Path, opts: RunOptions) -> Result<()> {
    let bytes = std::fs::read(path)?;
    let pipeline = build_pipeline(&config, opts)?;
    let mut session = Session::new();

    let exchange = pipeline
        .handle(&mut session, InputPayload::Uploaded(bytes))
        .await?;

    if !opts.quiet {
        println!(
            "{} {}",
            "Heard:".dimmed(),
            exchange.question.raw_text
        );
    }
    present(&exchange, pipeline.artifacts(), &config, opts);
    Ok(())
}

/// Ask by speaking into the microphone.
#[cfg(feature = "cpal-audio")]
pub async fn run_listen(config: Config, device: Option<String>, opts: RunOptions) -> Result<()> {
    use crate::audio::capture::MicrophoneSource;

    let pipeline = build_pipeline(&config, opts)?;
    let mut session = Session::new();

    let device = device.or_else(|| config.audio.device.clone());
    let source = MicrophoneSource::open(device.as_deref())?;

    if !opts.quiet {
        println!("{}", "Listening... speak your question.".cyan());
    }

    let exchange = pipeline
        .handle(&mut session, InputPayload::Microphone(Box::new(source)))
        .await?;

    if !opts.quiet {
        println!(
            "{} {}",
            "Heard:".dimmed(),
            exchange.question.raw_text
        );
    }
    present(&exchange, pipeline.artifacts(), &config, opts);
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
pub async fn run_listen(_config: Config, _device: Option<String>, _opts: RunOptions) -> Result<()> {
    Err(PolyvoxError::AudioCapture {
        message: concat!(
            "This binary was built without microphone support.\n",
            "Rebuild with: cargo build --features cpal-audio"
        )
        .to_string(),
    })
}
