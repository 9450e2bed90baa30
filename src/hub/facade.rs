//! Hub facade: the single entry point used by the transport layer

use crate::config::HubSettings;
use crate::error::{HubError, Result};
use crate::game::GameEngine;
use crate::hub::player::Client;
use crate::hub::queue::{MatchmakingQueue, QueueConfig};
use crate::hub::store::SessionStore;
use crate::metrics::MetricsCollector;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Matches clients and hands each matched player to the rule engine
#[derive(Clone)]
pub struct Hub {
    queue: MatchmakingQueue,
    store: SessionStore,
    engine: Arc<dyn GameEngine>,
    match_timeout: Option<Duration>,
    metrics: Arc<MetricsCollector>,
}

impl Hub {
    pub fn new(
        queue: MatchmakingQueue,
        store: SessionStore,
        engine: Arc<dyn GameEngine>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            queue,
            store,
            engine,
            match_timeout: None,
            metrics,
        }
    }

    /// Bound how long a client may wait for an opponent
    pub fn with_match_timeout(mut self, match_timeout: Option<Duration>) -> Self {
        self.match_timeout = match_timeout;
        self
    }

    /// Build a store and queue from settings and wrap them in a hub
    pub fn start(
        settings: &HubSettings,
        engine: Arc<dyn GameEngine>,
        metrics: Arc<MetricsCollector>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let store = SessionStore::new();
        let config = QueueConfig {
            intake_capacity: settings.queue_capacity,
            move_channel_capacity: settings.move_channel_capacity,
        };
        let (queue, pairing) =
            MatchmakingQueue::start(store.clone(), config, metrics.clone(), shutdown);

        let hub = Self::new(queue, store, engine, metrics)
            .with_match_timeout(settings.match_timeout_seconds.map(Duration::from_secs));
        (hub, pairing)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Queue the client, then play its game to the end
    pub async fn handle(&self, client: Client) -> Result<()> {
        self.handle_with_cancel(client, CancellationToken::new())
            .await
    }

    /// Like [`Hub::handle`], withdrawing the client from the queue if
    /// `cancel` fires before it is paired
    pub async fn handle_with_cancel(&self, client: Client, cancel: CancellationToken) -> Result<()> {
        let client_id = client.id().to_string();

        let enqueued = self.queue.enqueue_with_cancel(client, cancel);
        let player = match self.match_timeout {
            Some(limit) => match tokio::time::timeout(limit, enqueued).await {
                Ok(player) => player?,
                Err(_) => {
                    warn!(
                        "Client '{}' found no opponent within {:?}",
                        client_id, limit
                    );
                    return Err(HubError::MatchTimeout {
                        client_id,
                        seconds: limit.as_secs(),
                    }
                    .into());
                }
            },
            None => enqueued.await?,
        };

        let session_id = player.session_id().to_string();
        let state = self
            .store
            .get(&session_id)?
            .ok_or_else(|| HubError::SessionNotFound {
                session_id: session_id.clone(),
            })?;

        debug!(
            "Handing client '{}' to the rule engine - session: {}",
            client_id, session_id
        );
        let played = self.engine.play(player, state).await.context("play game");
        self.metrics.record_game_played(played.is_ok());
        played
    }
}
