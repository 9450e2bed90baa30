//! Reconnection policy of the playing client
//!
//! The client walks the address book in order, joining a game on the first
//! server that accepts it. A `switch-server` redirect tears the connection
//! down and resumes on the named server; any failure moves on to the next
//! entry, cycling until a game completes.

use crate::client::machine::{ClientSession, SessionOutcome};
use crate::client::view::ClientView;
use crate::config::{AddressBook, ClientSettings};
use crate::error::{HubError, Result};
use crate::protocol::transport::{ClientSocket, MessageStream};
use crate::types::GameResult;
use anyhow::Context;
use async_trait::async_trait;
use tracing::{info, warn};

/// Opens a message stream to the hub listening on a port
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, port: u16) -> Result<Box<dyn MessageStream>>;
}

/// Dials `ws://<dial_host>:<port><game_path>`
#[derive(Debug, Clone)]
pub struct WsConnector {
    dial_host: String,
    game_path: String,
}

impl WsConnector {
    pub fn new(settings: &ClientSettings) -> Self {
        Self {
            dial_host: settings.dial_host.clone(),
            game_path: settings.game_path.clone(),
        }
    }

    pub fn url(&self, port: u16) -> String {
        format!("ws://{}:{}{}", self.dial_host, port, self.game_path)
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, port: u16) -> Result<Box<dyn MessageStream>> {
        let url = self.url(port);
        info!("Trying to connect to server '{}'...", url);
        let socket = ClientSocket::connect(&url).await?;
        Ok(Box::new(socket))
    }
}

/// Plays one game, surviving server failover
pub struct FailoverClient<C> {
    book: AddressBook,
    connector: C,
    max_rounds: Option<usize>,
}

impl<C: Connector> FailoverClient<C> {
    pub fn new(book: AddressBook, connector: C) -> Self {
        Self {
            book,
            connector,
            max_rounds: None,
        }
    }

    /// Give up after this many passes over the address book
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Cycle through the known servers until one game has been played
    pub async fn run(&self, view: &mut dyn ClientView) -> Result<GameResult> {
        if self.book.is_empty() {
            return Err(HubError::ConfigurationError {
                message: "No servers configured".to_string(),
            }
            .into());
        }

        let mut round = 0;
        loop {
            if self.max_rounds.is_some_and(|max| round >= max) {
                return Err(HubError::Transport {
                    message: format!("no server accepted the game after {} rounds", round),
                }
                .into());
            }
            round += 1;

            for entry in self.book.entries() {
                match self.connect_to_server(entry.port, view).await {
                    Ok(result) => return Ok(result),
                    Err(e) => {
                        if matches!(e.downcast_ref::<HubError>(), Some(HubError::InputClosed)) {
                            return Err(e);
                        }
                        warn!("Failed to play on server '{}': {:#}", entry.host, e);
                    }
                }
            }
        }
    }

    /// Play on the server at `port`, following redirects until the game ends
    pub async fn connect_to_server(
        &self,
        mut port: u16,
        view: &mut dyn ClientView,
    ) -> Result<GameResult> {
        loop {
            let mut stream = self
                .connector
                .connect(port)
                .await
                .context("websocket dial")?;

            let mut session = ClientSession::new();
            let outcome = session.run(stream.as_mut(), view).await;
            stream.close().await?;

            match outcome.context("handle actions")? {
                SessionOutcome::Finished(result) => return Ok(result),
                SessionOutcome::Switch(host) => {
                    port = self
                        .book
                        .port_for(&host)
                        .ok_or_else(|| HubError::UnknownMasterServer { host: host.clone() })?;
                    info!("Switching to server '{}'", host);
                }
            }
        }
    }
}
