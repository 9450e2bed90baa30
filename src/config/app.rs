//! Main application configuration
//!
//! This module defines the primary configuration structures for the hub and
//! the client, including TOML/environment loading and validation.

use crate::config::servers::{AddressBook, ServerEntry};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub hub: HubSettings,
    pub replication: ReplicationSettings,
    pub client: ClientSettings,
    /// Known hub servers, in the order clients try them
    pub servers: Vec<ServerEntry>,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Interface the HTTP/websocket server binds to
    pub host: String,
    /// Port the HTTP/websocket server binds to
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Matchmaking and session store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    /// Capacity of the matchmaking intake channel
    pub queue_capacity: usize,
    /// Capacity of each session's move channel
    pub move_channel_capacity: usize,
    /// Period of the prune-and-publish synchronizer tick
    pub sync_period_seconds: u64,
    /// Optional bound on how long a client waits for an opponent
    pub match_timeout_seconds: Option<u64>,
}

/// State replication settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicationSettings {
    /// File the replication consumer writes each snapshot to
    pub snapshot_path: Option<PathBuf>,
    /// Capacity of the outward snapshot channel
    pub snapshot_channel_capacity: usize,
}

/// Client-side connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Host the client dials; servers are distinguished by port
    pub dial_host: String,
    /// Websocket path of the game endpoint
    pub game_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service: ServiceSettings::default(),
            hub: HubSettings::default(),
            replication: ReplicationSettings::default(),
            client: ClientSettings::default(),
            servers: vec![ServerEntry::new("localhost", 8080)],
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "tictactoe-hub".to_string(),
            log_level: "info".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 2,
            move_channel_capacity: 2,
            sync_period_seconds: 5,
            match_timeout_seconds: None,
        }
    }
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            snapshot_path: None,
            snapshot_channel_capacity: 1,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            dial_host: "localhost".to_string(),
            game_path: "/game".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Parse configuration from a TOML document without validating it
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse TOML configuration")
    }

    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        validate_config(&config)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            self.service.log_level = log_level;
        }
        if let Ok(host) = env::var("HUB_HOST") {
            self.service.host = host;
        }
        if let Ok(port) = env::var("HUB_PORT") {
            self.service.port = port
                .parse()
                .map_err(|_| anyhow!("Invalid HUB_PORT value: {}", port))?;
        }

        // Hub settings
        if let Ok(capacity) = env::var("HUB_QUEUE_CAPACITY") {
            self.hub.queue_capacity = capacity
                .parse()
                .map_err(|_| anyhow!("Invalid HUB_QUEUE_CAPACITY value: {}", capacity))?;
        }
        if let Ok(period) = env::var("HUB_SYNC_PERIOD_SECONDS") {
            self.hub.sync_period_seconds = period
                .parse()
                .map_err(|_| anyhow!("Invalid HUB_SYNC_PERIOD_SECONDS value: {}", period))?;
        }
        if let Ok(timeout) = env::var("HUB_MATCH_TIMEOUT_SECONDS") {
            self.hub.match_timeout_seconds = Some(
                timeout
                    .parse()
                    .map_err(|_| anyhow!("Invalid HUB_MATCH_TIMEOUT_SECONDS value: {}", timeout))?,
            );
        }

        // Replication settings
        if let Ok(path) = env::var("SNAPSHOT_PATH") {
            self.replication.snapshot_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    /// Get synchronizer period as Duration
    pub fn sync_period(&self) -> Duration {
        Duration::from_secs(self.hub.sync_period_seconds)
    }

    /// Get the optional matchmaking timeout as Duration
    pub fn match_timeout(&self) -> Option<Duration> {
        self.hub.match_timeout_seconds.map(Duration::from_secs)
    }

    /// Build the immutable address book used by clients
    pub fn address_book(&self) -> AddressBook {
        AddressBook::new(self.servers.clone())
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.port == 0 {
        return Err(anyhow!("Service port cannot be 0"));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.hub.sync_period_seconds == 0 {
        return Err(anyhow!("Sync period must be greater than 0"));
    }
    if config.hub.match_timeout_seconds == Some(0) {
        return Err(anyhow!("Match timeout must be greater than 0 when set"));
    }

    // Validate channel capacities
    if config.hub.queue_capacity == 0 {
        return Err(anyhow!("Queue capacity must be greater than 0"));
    }
    if config.hub.move_channel_capacity == 0 {
        return Err(anyhow!("Move channel capacity must be greater than 0"));
    }
    if config.replication.snapshot_channel_capacity == 0 {
        return Err(anyhow!("Snapshot channel capacity must be greater than 0"));
    }

    // Validate address book
    if config.servers.is_empty() {
        return Err(anyhow!("At least one server must be configured"));
    }
    for (index, server) in config.servers.iter().enumerate() {
        if server.host.is_empty() {
            return Err(anyhow!("Server entry {} has an empty host", index));
        }
        if server.port == 0 {
            return Err(anyhow!("Server '{}' port cannot be 0", server.host));
        }
        if config.servers[..index].iter().any(|s| s.host == server.host) {
            return Err(anyhow!("Duplicate server host: {}", server.host));
        }
    }

    if !config.client.game_path.starts_with('/') {
        return Err(anyhow!("Game path must start with '/'"));
    }

    Ok(())
}
