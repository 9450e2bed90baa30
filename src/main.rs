//! Main entry point for the tic-tac-toe hub server
//!
//! This is the production entry point that initializes and runs the hub
//! with proper error handling, logging, and graceful shutdown.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tictactoe_hub::config::{validate_config, AppConfig};
use tictactoe_hub::service::{AppState, HealthCheck};
use tokio::signal;
use tracing::{error, info, warn};

/// Tic-tac-toe hub - matchmaking and game-state server
#[derive(Parser)]
#[command(
    name = "tictactoe-hub",
    version,
    about = "A matchmaking and game-state hub for two-player tic-tac-toe",
    long_about = "The hub pairs websocket clients into tic-tac-toe sessions, relays their moves, \
                 prunes finished games and replicates a snapshot of every live session so a \
                 standby instance can take over with --promote."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Port override
    #[arg(short, long, value_name = "PORT", help = "Override the listening port")]
    port: Option<u16>,

    /// Adopt the replicated snapshot before serving
    #[arg(
        long,
        help = "Take over as master by loading the snapshot at replication.snapshot_path"
    )]
    promote: bool,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(
        long,
        help = "Validate configuration and exit without starting service"
    )]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with service information
fn display_startup_banner(config: &AppConfig) {
    info!("🚀 Tic-tac-toe hub");
    info!("   Service: {}", config.service.name);
    info!("   Log level: {}", config.service.log_level);
    info!("   Listening: {}:{}", config.service.host, config.service.port);
    info!("   Sync period: {}s", config.hub.sync_period_seconds);
    match config.hub.match_timeout_seconds {
        Some(seconds) => info!("   Match timeout: {}s", seconds),
        None => info!("   Match timeout: none"),
    }
    match &config.replication.snapshot_path {
        Some(path) => info!("   Snapshot file: {}", path.display()),
        None => info!("   Snapshot file: disabled"),
    }
    info!("   Known servers: {}", config.servers.len());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(port) = args.port {
        config.service.port = port;
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without starting service");
        return Ok(());
    }

    display_startup_banner(&config);

    info!("Initializing service components...");
    let mut app_state = match AppState::new(config.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    if args.promote {
        let Some(path) = config.replication.snapshot_path.as_deref() else {
            error!("--promote needs replication.snapshot_path to be configured");
            std::process::exit(1);
        };
        match app_state.promote(path).await {
            Ok(adopted) => info!("Promoted to master with {} sessions", adopted),
            Err(e) => {
                error!("Failed to promote: {}", e);
                std::process::exit(1);
            }
        }
    }

    info!("Starting service...");
    let addr = match app_state.start().await {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to start service: {}", e);
            std::process::exit(1);
        }
    };

    let health = HealthCheck::check(&app_state.server_state());
    info!("✅ Tic-tac-toe hub is running on {} - {}", addr, health.status);
    info!("Press Ctrl+C to shutdown gracefully...");

    wait_for_shutdown_signal().await;

    info!("🛑 Shutdown signal received, beginning graceful shutdown...");
    match app_state.shutdown().await {
        Ok(()) => info!("✅ Graceful shutdown completed successfully"),
        Err(e) => warn!("⚠️  {}", e),
    }

    info!("🛑 Tic-tac-toe hub stopped");
    Ok(())
}
