use anyhow::Result;
use clap::Parser;
use polyvox::app::{RunOptions, run_ask, run_chat, run_listen, run_upload};
use polyvox::cli::{Cli, Commands};
use polyvox::config::Config;
use tracing_subscriber::EnvFilter;

fn init_tracing(quiet: bool, verbose: u8) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("polyvox={default_level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&Config::default_path())?,
    };
    Ok(config.with_env_overrides())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(secs) = cli.timeout {
        config.limits.model_secs = secs;
    }

    let opts = RunOptions {
        quiet: cli.quiet,
        no_audio: cli.no_audio,
    };

    match cli.command {
        Commands::Ask { text } => run_ask(config, text, opts).await?,
        Commands::Chat => run_chat(config, opts).await?,
        Commands::Listen { device } => run_listen(config, device, opts).await?,
        Commands::Upload { path } => run_upload(config, &path, opts).await?,
        Commands::Devices => list_audio_devices()?,
    }

    Ok(())
}

#[cfg(feature = "cpal-audio")]
fn list_audio_devices() -> Result<()> {
    let devices = polyvox::audio::capture::list_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
    } else {
        println!("Available audio input devices:");
        for device in devices {
            println!("  {device}");
        }
    }
    Ok(())
}

#[cfg(not(feature = "cpal-audio"))]
fn list_audio_devices() -> Result<()> {
    println!("This binary was built without microphone support.");
    println!("Rebuild with: cargo build --features cpal-audio");
    Ok(())
}
