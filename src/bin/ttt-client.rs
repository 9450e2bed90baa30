//! Terminal client for the tic-tac-toe hub
//!
//! Joins a game on the first configured server that accepts it and follows
//! `switch-server` redirects when the controlling server changes.
//!
//! Usage:
//!   cargo run --bin ttt-client -- --config ./conf/config.toml

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tictactoe_hub::client::{FailoverClient, TerminalView, WsConnector};
use tictactoe_hub::config::AppConfig;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ttt-client", version)]
#[command(about = "Play tic-tac-toe against another client through the hub")]
struct Cli {
    /// Configuration file listing the known servers
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Stop after this many passes over the server list
    #[arg(long, value_name = "N")]
    max_rounds: Option<usize>,
}

/// Log to stderr so stdout stays the game board
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    let book = config.address_book();
    info!("Known servers: {}", book.len());

    let mut client = FailoverClient::new(book, WsConnector::new(&config.client));
    if let Some(max_rounds) = cli.max_rounds {
        client = client.with_max_rounds(max_rounds);
    }

    let mut view = TerminalView::new();
    match client.run(&mut view).await {
        Ok(result) => {
            info!("Game over - {:?}", result);
            Ok(())
        }
        Err(e) => {
            error!("Client stopped: {:#}", e);
            Err(e)
        }
    }
}
