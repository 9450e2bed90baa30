//! Rule engine driving one matched player through a game
//!
//! The hub hands every matched [`Player`] to a [`GameEngine`] together with
//! the session's shared state. [`RelayEngine`] is the default engine: it asks
//! the player whose turn it is for a move, applies it to the shared state and
//! relays it to the opponent over the session's move channel.

use crate::error::{HubError, Result};
use crate::game::rules;
use crate::hub::player::Player;
use crate::hub::store::SharedGameState;
use crate::protocol::messages::{Message, PlayerMovePayload};
use crate::types::{Cell, GameResult, GameState};
use anyhow::Context;
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Plays one player's side of a session
#[async_trait]
pub trait GameEngine: Send + Sync {
    /// Drive the player until the game ends; the state is mutated in place
    async fn play(&self, player: Player, state: SharedGameState) -> Result<()>;
}

/// Engine relaying moves between the two players of a session
#[derive(Debug, Clone, Default)]
pub struct RelayEngine;

impl RelayEngine {
    pub fn new() -> Self {
        Self
    }
}

fn read_state<T>(state: &SharedGameState, f: impl FnOnce(&GameState) -> T) -> Result<T> {
    let state = state.read().map_err(|_| HubError::InternalError {
        message: "Failed to acquire session state lock".to_string(),
    })?;
    Ok(f(&state))
}

fn write_state<T>(state: &SharedGameState, f: impl FnOnce(&mut GameState) -> T) -> Result<T> {
    let mut state = state.write().map_err(|_| HubError::InternalError {
        message: "Failed to acquire session state lock".to_string(),
    })?;
    Ok(f(&mut state))
}

/// What happened while waiting on the local client
enum ClientTurn {
    Moved(u8, Option<GameResult>),
    OpponentLeft,
}

#[async_trait]
impl GameEngine for RelayEngine {
    async fn play(&self, player: Player, state: SharedGameState) -> Result<()> {
        let session_id = player.session_id().to_string();
        let played = self.drive(player, &state).await;
        if played.is_err() {
            // A failed side ends the session so the synchronizer can prune it
            let ended = write_state(&state, rules::finish_by_walkover)?;
            if ended {
                warn!("Session {} ended by walkover after a player failed", session_id);
            }
        }
        played
    }
}

impl RelayEngine {
    async fn drive(&self, mut player: Player, state: &SharedGameState) -> Result<()> {
        let mark = player.mark();
        let board = write_state(state, |state| {
            rules::start(state);
            state.board
        })?;

        player
            .stream()
            .send(&Message::start_game(mark, board))
            .await
            .context("send start game")?;

        let mut my_turn = read_state(state, |state| state.current_move == mark)?;
        if my_turn {
            player
                .stream()
                .send(&Message::request_move())
                .await
                .context("send request move")?;
        }

        loop {
            if my_turn {
                match self.await_client_move(&mut player, state).await? {
                    ClientTurn::Moved(position, result) => {
                        player.broadcast_move(position)?;
                        player
                            .stream()
                            .send(&Message::PlayerMove(PlayerMovePayload {
                                cell_type: mark,
                                position,
                                game_result: result,
                                is_move_requested: false,
                            }))
                            .await
                            .context("confirm player move")?;

                        if let Some(result) = result {
                            info!(
                                "Session {} finished by {}'s move - {:?}",
                                player.session_id(),
                                mark,
                                result
                            );
                            return Ok(());
                        }
                        my_turn = false;
                    }
                    ClientTurn::OpponentLeft => return self.walkover(&mut player, state).await,
                }
            } else {
                let Some(relayed) = player.next_opponent_move().await? else {
                    return self.walkover(&mut player, state).await;
                };

                let result = read_state(state, |state| state.result)?;
                player
                    .stream()
                    .send(&Message::PlayerMove(PlayerMovePayload {
                        cell_type: relayed.mark,
                        position: relayed.position,
                        game_result: result,
                        is_move_requested: result.is_none(),
                    }))
                    .await
                    .context("relay opponent move")?;

                if result.is_some() {
                    return Ok(());
                }
                my_turn = true;
            }
        }
    }

    /// Read messages from the local client until it makes a legal move
    async fn await_client_move(
        &self,
        player: &mut Player,
        state: &SharedGameState,
    ) -> Result<ClientTurn> {
        let mark = player.mark();
        let abandoned = player.abandoned().clone();

        loop {
            let received = tokio::select! {
                biased;
                received = player.stream().recv() => received.context("read player move")?,
                _ = abandoned.cancelled() => return Ok(ClientTurn::OpponentLeft),
            };

            let payload = match received {
                Some(Message::PlayerMove(payload)) => payload,
                Some(other) => {
                    warn!(
                        "Ignoring unexpected '{}' message from client '{}'",
                        other.kind(),
                        player.client_id()
                    );
                    continue;
                }
                None => {
                    return Err(HubError::Transport {
                        message: format!("client '{}' disconnected", player.client_id()),
                    }
                    .into())
                }
            };

            if payload.cell_type != mark {
                warn!(
                    "Client '{}' sent a move for {} but plays {}",
                    player.client_id(),
                    payload.cell_type,
                    mark
                );
            }

            let applied = write_state(state, |state| {
                rules::apply_move(state, mark, payload.position)
            })?;
            match applied {
                Ok(result) => {
                    debug!(
                        "Session {} - {} placed at {}",
                        player.session_id(),
                        mark,
                        payload.position
                    );
                    return Ok(ClientTurn::Moved(payload.position, result));
                }
                Err(HubError::InvalidMove { reason }) => {
                    debug!(
                        "Rejected move from client '{}': {}",
                        player.client_id(),
                        reason
                    );
                    player
                        .stream()
                        .send(&Message::request_move())
                        .await
                        .context("re-request move")?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn walkover(&self, player: &mut Player, state: &SharedGameState) -> Result<()> {
        let ended_now = write_state(state, rules::finish_by_walkover)?;
        if ended_now {
            info!(
                "Session {} ended by walkover for client '{}'",
                player.session_id(),
                player.client_id()
            );
        }
        player
            .stream()
            .send(&Message::walkover(GameResult::Walkover))
            .await
            .context("send walkover")
    }
}
