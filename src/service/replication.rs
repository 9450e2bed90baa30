//! Replication consumer: the always-listening end of the snapshot channel
//!
//! Each published snapshot is written as JSON to the configured file, going
//! through a temporary file and a rename so a standby never reads a torn
//! write. A standby started with `--promote` loads that file and adopts it.

use crate::error::{HubError, Result};
use crate::types::StateSnapshot;
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Writes snapshots to a file, or drops them when no path is configured
#[derive(Debug, Clone)]
pub struct SnapshotFileSink {
    path: Option<PathBuf>,
}

impl SnapshotFileSink {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist one snapshot
    pub async fn write(&self, snapshot: &StateSnapshot) -> Result<()> {
        let Some(path) = &self.path else {
            debug!("No snapshot path configured, dropping {} sessions", snapshot.len());
            return Ok(());
        };

        let json = serde_json::to_vec_pretty(snapshot).map_err(|e| HubError::InternalError {
            message: format!("Failed to serialize snapshot: {}", e),
        })?;

        let mut staging = path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        tokio::fs::write(&staging, json)
            .await
            .with_context(|| format!("write snapshot to {}", staging.display()))?;
        tokio::fs::rename(&staging, path)
            .await
            .with_context(|| format!("move snapshot into {}", path.display()))?;

        debug!(
            "Wrote snapshot of {} sessions to {}",
            snapshot.len(),
            path.display()
        );
        Ok(())
    }

    /// Drain the snapshot channel until it closes or shutdown fires
    pub fn start(
        self,
        mut snapshots: mpsc::Receiver<StateSnapshot>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            match &self.path {
                Some(path) => info!("Replicating snapshots to {}", path.display()),
                None => info!("No snapshot path configured, snapshots are discarded"),
            }

            loop {
                let snapshot = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    snapshot = snapshots.recv() => snapshot,
                };
                let Some(snapshot) = snapshot else { break };

                if let Err(e) = self.write(&snapshot).await {
                    error!("Failed to replicate snapshot: {:#}", e);
                }
            }

            info!("Replication consumer stopped");
        })
    }
}

/// Read a snapshot previously written by [`SnapshotFileSink`]
pub async fn load_snapshot(path: &Path) -> Result<StateSnapshot> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read snapshot from {}", path.display()))?;

    let snapshot = serde_json::from_slice(&bytes).map_err(|e| HubError::ConfigurationError {
        message: format!("Invalid snapshot file {}: {}", path.display(), e),
    })?;
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, GameState, GameStatus};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn snapshot() -> StateSnapshot {
        let mut state = GameState::new("x".to_string(), "o".to_string());
        state.board[4] = Cell::X;
        state.current_move = Cell::O;
        state.status = GameStatus::InProgress;

        let mut sessions = HashMap::new();
        sessions.insert("s1".to_string(), state);
        StateSnapshot::new(sessions)
    }

    #[tokio::test]
    async fn test_written_snapshot_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let sink = SnapshotFileSink::new(Some(path.clone()));

        let written = snapshot();
        sink.write(&written).await.unwrap();

        assert_eq!(load_snapshot(&path).await.unwrap(), written);
        assert!(!dir.path().join("snapshot.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_sink_without_path_discards() {
        let sink = SnapshotFileSink::new(None);
        sink.write(&snapshot()).await.unwrap();
        assert!(sink.path().is_none());
    }

    #[tokio::test]
    async fn test_consumer_persists_latest_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        let (tx, rx) = mpsc::channel(1);
        let handle =
            SnapshotFileSink::new(Some(path.clone())).start(rx, CancellationToken::new());

        tx.send(StateSnapshot::new(HashMap::new())).await.unwrap();
        tx.send(snapshot()).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(load_snapshot(&path).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let err = load_snapshot(&path).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HubError>(),
            Some(HubError::ConfigurationError { .. })
        ));
    }
}
