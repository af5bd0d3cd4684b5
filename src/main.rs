use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use live_translate::{create_local_asr_router, create_router, AppState, Config, LocalAsrState};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "live-translate", version, about = "Live speech translation relay")]
struct Cli {
    /// Config file, without extension
    #[arg(long, default_value = "config/live-translate")]
    config: String,

    /// Overrides service.log_level (RUST_LOG wins over both)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve live translation sessions on /ws/live
    Gateway,
    /// Serve the local windowed ASR endpoint
    LocalAsr,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let level = cli.log_level.as_deref().unwrap_or(&cfg.service.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Gateway => run_gateway(&cfg).await,
        Command::LocalAsr => run_local_asr(&cfg).await,
    }
}

async fn run_gateway(cfg: &Config) -> Result<()> {
    let state = AppState::from_config(cfg)?;
    let addr = cfg.service.http.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Gateway listening on ws://{}/ws/live", addr);
    info!("Transcript source: {:?}", cfg.gateway.source);
    info!("Translation backend: {}", cfg.translation.base_url);

    axum::serve(listener, create_router(state))
        .await
        .context("Gateway server failed")
}

async fn run_local_asr(cfg: &Config) -> Result<()> {
    let state = LocalAsrState::from_config(cfg)?;
    let addr = cfg.local_asr.http.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(
        "Local ASR listening on ws://{}{} (whisper={})",
        addr, cfg.local_asr.path_prefix, cfg.whisper.base_url
    );

    axum::serve(listener, create_local_asr_router(state))
        .await
        .context("Local ASR server failed")
}
