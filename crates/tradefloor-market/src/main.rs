use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tradefloor_market::feed::{FeedConfig, FeedDaemon};
use tradefloor_market::quotes::QuoteWriter;

#[derive(Parser, Debug)]
#[command(
    name = "tradefloor-feed",
    about = "Quote feed daemon - publishes random-walk quotes to the shared quote board"
)]
struct Cli {
    /// Path to feed configuration file
    #[arg(short, long, default_value = "config/feed.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config_str = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("Failed to read config: {}", cli.config))?;
    let config: FeedConfig =
        toml::from_str(&config_str).with_context(|| "Failed to parse feed config")?;

    let writer = QuoteWriter::open(&config.quotes_path)
        .with_context(|| format!("Failed to open quote board: {}", config.quotes_path))?;

    let daemon = FeedDaemon::new(config, writer);
    let cancel = daemon.cancel_token();

    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received shutdown signal");
        cancel.cancel();
    });

    daemon.run().await;

    Ok(())
}
