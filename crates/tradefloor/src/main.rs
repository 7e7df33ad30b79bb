use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tradefloor_agents::ClaudeEngine;
use tradefloor_models::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "tradefloor", about = "Autonomous trading floor simulation")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/tradefloor.toml")]
    config: String,

    /// Run a single tick and exit instead of looping
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: AppConfig = toml::from_str(&config_str).with_context(|| "Failed to parse config")?;

    let floor = tradefloor::build_floor(&config).context("Failed to build trading floor")?;

    if !ClaudeEngine::cli_available().await {
        warn!("claude CLI not found on PATH; trader runs will fail until it is installed");
    }

    if cli.once {
        // Per-trader failures are already contained and logged; a completed
        // tick is a successful run.
        let summary = floor.run_tick().await;
        info!(?summary, "Single tick finished");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            shutdown.cancel();
        }
    });

    floor.run_forever(cancel).await;
    Ok(())
}
