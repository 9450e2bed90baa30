//! Main application state and service coordination
//!
//! `AppState` wires the hub, the state synchronizer, the replication
//! consumer and the HTTP server together and owns their background tasks.

use crate::config::AppConfig;
use crate::game::RelayEngine;
use crate::hub::{Hub, StateSynchronizer};
use crate::metrics::MetricsCollector;
use crate::service::replication::{load_snapshot, SnapshotFileSink};
use crate::service::server::{self, ServerState};
use crate::types::StateSnapshot;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },

    #[error("Background task error: {message}")]
    BackgroundTask { message: String },
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Matchmaking and session hub
    hub: Hub,

    /// Prune-and-publish task driver
    synchronizer: Arc<StateSynchronizer>,

    /// Outward snapshot channel, taken by the replication consumer on start
    snapshots: Option<mpsc::Receiver<StateSnapshot>>,

    metrics: Arc<MetricsCollector>,

    /// Cancelled to stop every background task
    shutdown: CancellationToken,

    /// Background task handles
    background_tasks: Vec<JoinHandle<()>>,

    started_at: Instant,
}

impl AppState {
    /// Build every component; nothing listens until [`AppState::start`]
    pub fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing tic-tac-toe hub");
        info!(
            "Configuration: service={}, bind={}:{}",
            config.service.name, config.service.host, config.service.port
        );

        let metrics =
            Arc::new(
                MetricsCollector::new().map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to create metrics collector: {}", e),
                })?,
            );
        let shutdown = CancellationToken::new();

        let (hub, pairing) = Hub::start(
            &config.hub,
            Arc::new(RelayEngine::new()),
            metrics.clone(),
            shutdown.clone(),
        );

        let (synchronizer, snapshots) = StateSynchronizer::new(
            hub.store().clone(),
            config.sync_period(),
            config.replication.snapshot_channel_capacity,
            metrics.clone(),
        );

        Ok(Self {
            config,
            hub,
            synchronizer: Arc::new(synchronizer),
            snapshots: Some(snapshots),
            metrics,
            shutdown,
            background_tasks: vec![pairing],
            started_at: Instant::now(),
        })
    }

    /// Adopt the snapshot a previous master replicated to `path`
    pub async fn promote(&self, path: &Path) -> Result<usize, ServiceError> {
        info!("Promoting to master from snapshot {}", path.display());

        let snapshot = load_snapshot(path)
            .await
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to load snapshot: {:#}", e),
            })?;
        let adopted = snapshot.len();

        self.synchronizer
            .apply_states(snapshot)
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to apply snapshot: {}", e),
            })?;
        Ok(adopted)
    }

    /// Bind the listener and start every background task
    pub async fn start(&mut self) -> Result<SocketAddr, ServiceError> {
        info!("Starting tic-tac-toe hub");

        let snapshots = self
            .snapshots
            .take()
            .ok_or_else(|| ServiceError::Configuration {
                message: "Service was already started".to_string(),
            })?;

        let bind = format!("{}:{}", self.config.service.host, self.config.service.port);
        let listener =
            TcpListener::bind(&bind)
                .await
                .map_err(|e| ServiceError::Initialization {
                    message: format!("Failed to bind {}: {}", bind, e),
                })?;
        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Initialization {
                message: format!("Failed to read bound address: {}", e),
            })?;

        let sink = SnapshotFileSink::new(self.config.replication.snapshot_path.clone());
        self.background_tasks
            .push(sink.start(snapshots, self.shutdown.clone()));

        self.background_tasks
            .push(self.synchronizer.clone().start(self.shutdown.clone()));

        self.background_tasks.push(self.start_uptime_task());

        let state = self.server_state();
        self.background_tasks.push(tokio::spawn(async move {
            if let Err(e) = server::serve(listener, state).await {
                error!("HTTP server failed: {}", e);
            }
        }));

        info!(
            "✅ Hub started with {} background tasks",
            self.background_tasks.len()
        );
        Ok(addr)
    }

    /// Stop every background task, waiting at most the configured timeout
    pub async fn shutdown(&mut self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of the hub");
        self.shutdown.cancel();

        let task_count = self.background_tasks.len();
        let deadline = tokio::time::Instant::now() + self.config.shutdown_timeout();
        let mut timed_out = 0;

        for task in self.background_tasks.drain(..) {
            let abort = task.abort_handle();
            if tokio::time::timeout_at(deadline, task).await.is_err() {
                abort.abort();
                timed_out += 1;
            }
        }

        if let Ok(stats) = self.hub.store().stats() {
            info!(
                "Final session counts - ready: {}, in progress: {}, finished: {}",
                stats.ready_to_start, stats.in_progress, stats.finished
            );
        }

        if timed_out > 0 {
            warn!(
                "{} of {} background tasks did not stop in time",
                timed_out, task_count
            );
            return Err(ServiceError::BackgroundTask {
                message: format!("{} background tasks were aborted", timed_out),
            });
        }

        info!("✅ All {} background tasks stopped", task_count);
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled()
    }

    /// Router state sharing this service's hub and metrics
    pub fn server_state(&self) -> ServerState {
        ServerState {
            hub: self.hub.clone(),
            metrics: self.metrics.clone(),
            service_name: self.config.service.name.clone(),
            started_at: self.started_at,
            shutdown: self.shutdown.clone(),
        }
    }

    fn start_uptime_task(&self) -> JoinHandle<()> {
        let metrics = self.metrics.clone();
        let shutdown = self.shutdown.clone();
        let started_at = self.started_at;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(15));
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }
                let uptime_seconds = started_at.elapsed().as_secs() as i64;
                metrics.service().uptime_seconds.set(uptime_seconds);
                debug!("Updated uptime - {}s", uptime_seconds);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameState;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.service.host = "127.0.0.1".to_string();
        config.service.port = 0;
        config.service.shutdown_timeout_seconds = 5;
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let mut app = AppState::new(config()).unwrap();
        let addr = app.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(app.is_running());

        // A second start is refused
        assert!(app.start().await.is_err());

        app.shutdown().await.unwrap();
        assert!(!app.is_running());
    }

    #[tokio::test]
    async fn test_promote_adopts_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");

        let mut sessions = HashMap::new();
        sessions.insert(
            "replicated".to_string(),
            GameState::new("x".to_string(), "o".to_string()),
        );
        SnapshotFileSink::new(Some(path.clone()))
            .write(&StateSnapshot::new(sessions))
            .await
            .unwrap();

        let app = AppState::new(config()).unwrap();
        assert_eq!(app.promote(&path).await.unwrap(), 1);
        assert!(app.hub().store().get("replicated").unwrap().is_some());
    }
}
