//! Matchmaking queue: FIFO intake that pairs waiting clients two at a time
//!
//! Callers push an entry on a bounded intake channel and wait on a private
//! oneshot. A single pairing task holds at most one waiter and matches it with
//! the next live arrival, so an idle queue costs nothing.

use crate::error::{HubError, Result};
use crate::hub::player::{Client, Player};
use crate::hub::store::SessionStore;
use crate::metrics::MetricsCollector;
use crate::types::{Cell, Move};
use prometheus::IntGauge;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Tunable capacities of the queue
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Capacity of the intake channel
    pub intake_capacity: usize,
    /// Capacity of each session's move channel
    pub move_channel_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            intake_capacity: 2,
            move_channel_capacity: 2,
        }
    }
}

/// A caller waiting to be paired
struct QueuedClient {
    client: Client,
    reply: oneshot::Sender<Player>,
    cancel: CancellationToken,
    enqueued_at: Instant,
}

impl QueuedClient {
    /// The caller withdrew or stopped waiting
    fn is_abandoned(&self) -> bool {
        self.cancel.is_cancelled() || self.reply.is_closed()
    }
}

/// Handle used to enqueue clients; cheap to clone
#[derive(Clone)]
pub struct MatchmakingQueue {
    intake: mpsc::Sender<QueuedClient>,
    metrics: Arc<MetricsCollector>,
}

impl MatchmakingQueue {
    /// Create the queue and spawn its pairing task
    pub fn start(
        store: SessionStore,
        config: QueueConfig,
        metrics: Arc<MetricsCollector>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (intake, receiver) = mpsc::channel(config.intake_capacity.max(1));

        let pairer = Pairer {
            intake: receiver,
            store,
            move_channel_capacity: config.move_channel_capacity.max(1),
            metrics: metrics.clone(),
        };
        let handle = tokio::spawn(pairer.run(shutdown));

        info!(
            "Started matchmaking queue - intake capacity: {}, move channel capacity: {}",
            config.intake_capacity, config.move_channel_capacity
        );
        (Self { intake, metrics }, handle)
    }

    /// Wait until the client is paired with an opponent
    pub async fn enqueue(&self, client: Client) -> Result<Player> {
        self.enqueue_with_cancel(client, CancellationToken::new())
            .await
    }

    /// Wait until paired, or until `cancel` fires
    pub async fn enqueue_with_cancel(
        &self,
        client: Client,
        cancel: CancellationToken,
    ) -> Result<Player> {
        let client_id = client.id().to_string();
        let result = {
            let _waiting = WaitingGauge::enter(&self.metrics.matchmaking().clients_waiting);
            self.wait_for_opponent(client, cancel).await
        };

        match &result {
            Ok(player) => info!(
                "Client '{}' matched - session: {}, mark: {}",
                client_id,
                player.session_id(),
                player.mark()
            ),
            Err(e) => debug!("Client '{}' left the queue unmatched: {}", client_id, e),
        }
        result
    }

    async fn wait_for_opponent(&self, client: Client, cancel: CancellationToken) -> Result<Player> {
        let client_id = client.id().to_string();
        let (reply, completion) = oneshot::channel();
        let entry = QueuedClient {
            client,
            reply,
            cancel: cancel.clone(),
            enqueued_at: Instant::now(),
        };

        debug!("Enqueueing client '{}'", client_id);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(HubError::EnqueueCancelled { client_id: client_id.clone() }.into());
            }
            sent = self.intake.send(entry) => {
                sent.map_err(|_| HubError::QueueClosed)?;
            }
        }

        tokio::select! {
            biased;
            player = completion => player.map_err(|_| HubError::QueueClosed.into()),
            _ = cancel.cancelled() => Err(HubError::EnqueueCancelled { client_id }.into()),
        }
    }
}

/// Counts a caller as waiting until dropped, including when the wait is
/// abandoned mid-flight
struct WaitingGauge<'a>(&'a IntGauge);

impl<'a> WaitingGauge<'a> {
    fn enter(gauge: &'a IntGauge) -> Self {
        gauge.inc();
        Self(gauge)
    }
}

impl Drop for WaitingGauge<'_> {
    fn drop(&mut self) {
        self.0.dec();
    }
}

/// Background pairing process
struct Pairer {
    intake: mpsc::Receiver<QueuedClient>,
    store: SessionStore,
    move_channel_capacity: usize,
    metrics: Arc<MetricsCollector>,
}

impl Pairer {
    async fn run(mut self, shutdown: CancellationToken) {
        let mut held: Option<QueuedClient> = None;

        loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = self.intake.recv() => next,
            };
            let Some(entry) = next else { break };

            if entry.is_abandoned() {
                self.discard(&entry);
                continue;
            }

            held = match held.take() {
                Some(first) if first.is_abandoned() => {
                    self.discard(&first);
                    Some(entry)
                }
                Some(first) => self.pair(first, entry),
                None => Some(entry),
            };
        }

        info!("Matchmaking pairing task stopped");
    }

    fn discard(&self, entry: &QueuedClient) {
        debug!(
            "Discarding abandoned queue entry for client '{}'",
            entry.client.id()
        );
        self.metrics.record_entry_abandoned();
    }

    /// Match two live entries. Returns an entry to keep holding when the
    /// first one could not be delivered.
    fn pair(&self, lhs: QueuedClient, rhs: QueuedClient) -> Option<QueuedClient> {
        let session_id = match self.store.create(lhs.client.id(), rhs.client.id()) {
            Ok(session_id) => session_id,
            Err(e) => {
                error!(
                    "Failed to allocate session for '{}' and '{}': {}",
                    lhs.client.id(),
                    rhs.client.id(),
                    e
                );
                return None;
            }
        };

        // Both receivers exist before either caller is released
        let (moves_tx, _) = broadcast::channel::<Move>(self.move_channel_capacity);
        let lhs_moves = moves_tx.subscribe();
        let rhs_moves = moves_tx.subscribe();
        let abandoned = CancellationToken::new();
        let wait = lhs.enqueued_at.elapsed();

        let lhs_player = Player::new(
            session_id.clone(),
            lhs.client,
            Cell::X,
            moves_tx.clone(),
            lhs_moves,
            abandoned.clone(),
        );
        if lhs.reply.send(lhs_player).is_err() {
            warn!(
                "First client of session {} left before delivery, holding its opponent",
                session_id
            );
            if let Err(e) = self.store.remove(&session_id) {
                error!("Failed to remove undelivered session {}: {}", session_id, e);
            }
            self.metrics.record_entry_abandoned();
            return Some(rhs);
        }

        let rhs_player = Player::new(
            session_id.clone(),
            rhs.client,
            Cell::O,
            moves_tx,
            rhs_moves,
            abandoned,
        );
        if rhs.reply.send(rhs_player).is_err() {
            // The returned player is dropped here, which signals a walkover
            warn!(
                "Second client of session {} left before delivery, ending the game",
                session_id
            );
            self.finish_by_walkover(&session_id);
            self.metrics.record_entry_abandoned();
            return None;
        }

        self.metrics.record_session_created(wait);
        info!("Paired clients into session {}", session_id);
        None
    }

    fn finish_by_walkover(&self, session_id: &str) {
        match self.store.get(session_id) {
            Ok(Some(state)) => match state.write() {
                Ok(mut state) => {
                    crate::game::rules::finish_by_walkover(&mut state);
                }
                Err(_) => error!("Session {} state lock is poisoned", session_id),
            },
            Ok(None) => {}
            Err(e) => error!("Failed to look up session {}: {}", session_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::transport::MemoryStream;
    use crate::types::GameStatus;
    use std::time::Duration;
    use tokio::time::timeout;

    fn client(id: &str) -> Client {
        let (stream, _) = MemoryStream::pair();
        Client::with_id(id, Box::new(stream))
    }

    fn start_queue() -> (MatchmakingQueue, SessionStore, Arc<MetricsCollector>) {
        let store = SessionStore::new();
        let metrics = Arc::new(MetricsCollector::default());
        let (queue, _handle) = MatchmakingQueue::start(
            store.clone(),
            QueueConfig::default(),
            metrics.clone(),
            CancellationToken::new(),
        );
        (queue, store, metrics)
    }

    #[tokio::test]
    async fn test_two_clients_are_paired() {
        let (queue, store, _metrics) = start_queue();

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(client("alice")).await })
        };
        // Let the first client reach the queue before the second one
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = queue.enqueue(client("bob")).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first.mark(), Cell::X);
        assert_eq!(second.mark(), Cell::O);
        assert_eq!(first.session_id(), second.session_id());

        let state = store.get(first.session_id()).unwrap().unwrap();
        let state = state.read().unwrap();
        assert_eq!(state.player_x, "alice");
        assert_eq!(state.player_o, "bob");
        assert_eq!(state.status, GameStatus::ReadyToStart);
    }

    #[tokio::test]
    async fn test_single_client_keeps_waiting() {
        let (queue, store, _metrics) = start_queue();

        let waiting = timeout(Duration::from_millis(100), queue.enqueue(client("alone"))).await;
        assert!(waiting.is_err());
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_entry_is_never_paired() {
        let (queue, store, metrics) = start_queue();

        let cancel = CancellationToken::new();
        let withdrawn = {
            let queue = queue.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { queue.enqueue_with_cancel(client("gone"), cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let err = withdrawn.await.unwrap().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HubError>(),
            Some(HubError::EnqueueCancelled { .. })
        ));

        let first = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.enqueue(client("carol")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = queue.enqueue(client("dave")).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first.client_id(), "carol");
        assert_eq!(second.client_id(), "dave");
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(metrics.matchmaking().entries_abandoned_total.get(), 1);
        assert_eq!(metrics.matchmaking().clients_waiting.get(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_queue() {
        let store = SessionStore::new();
        let shutdown = CancellationToken::new();
        let (queue, handle) = MatchmakingQueue::start(
            store,
            QueueConfig::default(),
            Arc::new(MetricsCollector::default()),
            shutdown.clone(),
        );

        shutdown.cancel();
        handle.await.unwrap();

        let err = queue.enqueue(client("late")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HubError>(),
            Some(HubError::QueueClosed)
        ));
    }
}
