use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dictate_stream::{
    Config, DictateEvent, DictationController, FileAudioSource, SessionStatus, WsConnector,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "dictate", version, about = "Streaming dictation client")]
struct Cli {
    /// Configuration file (TOML, extension optional)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the transcription service endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Override the transcription language
    #[arg(long)]
    language: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Dictate from a 16 kHz mono WAV file, printing events as JSON lines
    File { wav: PathBuf },
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut cfg = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(endpoint) = cli.endpoint {
        cfg.transcribe.endpoint = endpoint;
    }
    if let Some(language) = cli.language {
        cfg.transcribe.language = language;
    }

    match cli.command {
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&cfg)?;
            println!("{}", rendered);
            Ok(())
        }
        Command::File { wav } => dictate_file(&cfg, wav).await,
    }
}

async fn dictate_file(cfg: &Config, wav: PathBuf) -> Result<()> {
    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Dictating {} via {}", wav.display(), cfg.transcribe.endpoint);

    let source = FileAudioSource::new(&wav, cfg.frame_duration());
    let (controller, handle, mut events) = DictationController::new(
        cfg.session_config(),
        Arc::new(source),
        Arc::new(WsConnector),
    );
    let mut snapshots = controller.snapshots();
    let driver = tokio::spawn(controller.run());

    handle.short_tap()?;

    // The first published snapshot follows the tap, so any idle or error
    // status seen here means the session is over
    let mut stopping = false;
    loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(&event)?,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = snapshots.borrow_and_update().status;
                if matches!(status, SessionStatus::Idle | SessionStatus::Error) {
                    break;
                }
            }
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl-C")?;
                if stopping {
                    warn!("Interrupted again, shutting down");
                    break;
                }
                info!("Interrupted, stopping dictation");
                stopping = true;
                handle.short_tap()?;
            }
        }
    }

    // Events are queued before the snapshot that follows them
    while let Ok(event) = events.try_recv() {
        print_event(&event)?;
    }

    if handle.shutdown().is_err() {
        warn!("Controller already stopped");
    }
    driver.await.context("Controller task panicked")??;
    Ok(())
}

fn print_event(event: &DictateEvent) -> Result<()> {
    println!("{}", serde_json::to_string(event)?);
    Ok(())
}
