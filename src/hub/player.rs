//! Connected clients and matched players

use crate::error::{HubError, Result};
use crate::protocol::transport::MessageStream;
use crate::types::{Cell, ClientId, Move, SessionId};
use crate::utils::generate_client_id;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::{CancellationToken, DropGuard};

/// A connection handle owned by the transport layer
pub struct Client {
    id: ClientId,
    stream: Box<dyn MessageStream>,
}

impl Client {
    /// Wrap a fresh connection, assigning it a new identifier
    pub fn new(stream: Box<dyn MessageStream>) -> Self {
        Self::with_id(generate_client_id(), stream)
    }

    pub fn with_id(id: impl Into<ClientId>, stream: Box<dyn MessageStream>) -> Self {
        Self {
            id: id.into(),
            stream,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn stream(&mut self) -> &mut dyn MessageStream {
        self.stream.as_mut()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("id", &self.id).finish()
    }
}

/// A client bound to a session with its mark.
///
/// Both players of a session share one move channel and one abandonment
/// token. Dropping a player cancels the token, which the opponent observes
/// as a walkover once no relayed move is pending.
pub struct Player {
    session_id: SessionId,
    client: Client,
    mark: Cell,
    moves_tx: broadcast::Sender<Move>,
    moves_rx: broadcast::Receiver<Move>,
    opponent_left: CancellationToken,
    _left: DropGuard,
}

impl Player {
    pub(crate) fn new(
        session_id: SessionId,
        client: Client,
        mark: Cell,
        moves_tx: broadcast::Sender<Move>,
        moves_rx: broadcast::Receiver<Move>,
        abandoned: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            client,
            mark,
            moves_tx,
            moves_rx,
            opponent_left: abandoned.clone(),
            _left: abandoned.drop_guard(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn client_id(&self) -> &str {
        self.client.id()
    }

    pub fn mark(&self) -> Cell {
        self.mark
    }

    /// The player's connection
    pub fn stream(&mut self) -> &mut dyn MessageStream {
        self.client.stream()
    }

    /// Token cancelled once either player of the session has left
    pub fn abandoned(&self) -> &CancellationToken {
        &self.opponent_left
    }

    /// Relay a move this player made to the opponent
    pub fn broadcast_move(&self, position: u8) -> Result<()> {
        self.moves_tx
            .send(Move {
                position,
                mark: self.mark,
            })
            .map(|_| ())
            .map_err(|_| {
                HubError::InternalError {
                    message: format!("Move channel of session {} is closed", self.session_id),
                }
                .into()
            })
    }

    /// Wait for the opponent's next move, `None` if the opponent left
    pub async fn next_opponent_move(&mut self) -> Result<Option<Move>> {
        loop {
            tokio::select! {
                biased;
                received = self.moves_rx.recv() => match received {
                    Ok(relayed) if relayed.mark == self.mark => continue,
                    Ok(relayed) => return Ok(Some(relayed)),
                    Err(RecvError::Closed) => return Ok(None),
                    Err(RecvError::Lagged(skipped)) => {
                        return Err(HubError::InternalError {
                            message: format!(
                                "Player {} missed {} moves in session {}",
                                self.client.id(), skipped, self.session_id
                            ),
                        }
                        .into())
                    }
                },
                _ = self.opponent_left.cancelled() => return Ok(None),
            }
        }
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("session_id", &self.session_id)
            .field("client_id", &self.client.id())
            .field("mark", &self.mark)
            .finish()
    }
}
