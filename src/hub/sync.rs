//! State synchronizer: periodic prune-and-publish of the session store
//!
//! Each tick prunes finished sessions and then hands a full snapshot to the
//! replication consumer over a bounded channel. Publishing waits for channel
//! capacity, so a consumer that stops draining stalls the next tick. A
//! snapshot coming the other way (promotion from standby) replaces the store
//! wholesale; this assumes a single promotion source and no concurrent
//! writers while it is applied.

use crate::error::{HubError, Result};
use crate::hub::store::SessionStore;
use crate::metrics::MetricsCollector;
use crate::types::StateSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of one synchronizer tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Finished sessions removed by the prune step
    pub pruned: usize,
    /// Sessions in the published snapshot
    pub published: usize,
}

/// Periodic pruning and snapshot publication
pub struct StateSynchronizer {
    store: SessionStore,
    period: Duration,
    outbound: mpsc::Sender<StateSnapshot>,
    metrics: Arc<MetricsCollector>,
}

impl StateSynchronizer {
    /// Create a synchronizer and the receiving end of its snapshot channel
    pub fn new(
        store: SessionStore,
        period: Duration,
        channel_capacity: usize,
        metrics: Arc<MetricsCollector>,
    ) -> (Self, mpsc::Receiver<StateSnapshot>) {
        let (outbound, snapshots) = mpsc::channel(channel_capacity.max(1));
        (
            Self {
                store,
                period,
                outbound,
                metrics,
            },
            snapshots,
        )
    }

    /// Prune finished sessions, then publish what remains
    pub async fn tick(&self) -> Result<TickReport> {
        let pruned = self.store.prune()?;
        if pruned > 0 {
            self.metrics.record_sessions_pruned(pruned);
        }

        let stats = self.store.stats()?;
        self.metrics
            .update_session_counts(stats.ready_to_start, stats.in_progress, stats.finished);

        let snapshot = StateSnapshot::new(self.store.snapshot()?);
        let published = snapshot.len();

        self.outbound
            .send(snapshot)
            .await
            .map_err(|_| HubError::InternalError {
                message: "Snapshot consumer dropped".to_string(),
            })?;
        self.metrics.record_snapshot_published(published);

        debug!(
            "Synchronizer tick - pruned: {}, published: {} sessions",
            pruned, published
        );
        Ok(TickReport { pruned, published })
    }

    /// Adopt state produced elsewhere, discarding the local store
    pub fn apply_states(&self, snapshot: StateSnapshot) -> Result<()> {
        let adopted = snapshot.len();
        self.store.replace(snapshot.sessions)?;
        self.metrics.record_snapshot_applied();

        info!(
            "Applied states - {} sessions adopted from snapshot taken at {}",
            adopted, snapshot.taken_at
        );
        Ok(())
    }

    /// Spawn the tick loop; the first tick fires one period after start
    pub fn start(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            info!("Started state synchronizer - period: {:?}", self.period);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let tick = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    tick = self.tick() => tick,
                };

                if let Err(e) = tick {
                    if self.outbound.is_closed() {
                        warn!("Snapshot consumer is gone, stopping synchronizer");
                        break;
                    }
                    error!("Synchronizer tick failed: {}", e);
                }
            }

            info!("State synchronizer stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GameState, GameStatus};
    use std::collections::HashMap;

    fn synchronizer(store: &SessionStore) -> (StateSynchronizer, mpsc::Receiver<StateSnapshot>) {
        StateSynchronizer::new(
            store.clone(),
            Duration::from_millis(20),
            1,
            Arc::new(MetricsCollector::default()),
        )
    }

    fn set_status(store: &SessionStore, session_id: &str, status: GameStatus) {
        store.get(session_id).unwrap().unwrap().write().unwrap().status = status;
    }

    #[tokio::test]
    async fn test_tick_prunes_then_publishes() {
        let store = SessionStore::new();
        let finished = store.create("a", "b").unwrap();
        let playing = store.create("c", "d").unwrap();
        set_status(&store, &finished, GameStatus::Finished);
        set_status(&store, &playing, GameStatus::InProgress);

        let (sync, mut snapshots) = synchronizer(&store);
        let report = sync.tick().await.unwrap();
        assert_eq!(report, TickReport { pruned: 1, published: 1 });

        let snapshot = snapshots.recv().await.unwrap();
        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.sessions[&playing].status, GameStatus::InProgress);
        assert!(store.get(&finished).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unfinished_sessions_survive_ticks() {
        let store = SessionStore::new();
        let session_id = store.create("a", "b").unwrap();
        let (sync, mut snapshots) = synchronizer(&store);

        for _ in 0..3 {
            sync.tick().await.unwrap();
            let snapshot = snapshots.recv().await.unwrap();
            assert!(snapshot.sessions.contains_key(&session_id));
        }
    }

    #[tokio::test]
    async fn test_apply_states_replaces_store() {
        let store = SessionStore::new();
        store.create("local", "only").unwrap();
        let (sync, _snapshots) = synchronizer(&store);

        let mut sessions = HashMap::new();
        sessions.insert(
            "remote".to_string(),
            GameState::new("x".to_string(), "o".to_string()),
        );
        sync.apply_states(StateSnapshot::new(sessions.clone())).unwrap();

        assert_eq!(store.snapshot().unwrap(), sessions);
    }

    #[tokio::test]
    async fn test_tick_fails_without_consumer() {
        let store = SessionStore::new();
        let (sync, snapshots) = synchronizer(&store);
        drop(snapshots);
        assert!(sync.tick().await.is_err());
    }

    #[tokio::test]
    async fn test_background_loop_publishes_periodically() {
        let store = SessionStore::new();
        let session_id = store.create("a", "b").unwrap();
        let (sync, mut snapshots) = synchronizer(&store);

        let shutdown = CancellationToken::new();
        let handle = Arc::new(sync).start(shutdown.clone());

        let first = snapshots.recv().await.unwrap();
        let second = snapshots.recv().await.unwrap();
        assert!(first.sessions.contains_key(&session_id));
        assert!(second.taken_at >= first.taken_at);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
