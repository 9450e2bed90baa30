//! Per-connection state machine of the playing client
//!
//! A session reads one message at a time from the hub and reacts to it. It
//! only ever sends a move after the hub asked for one, and it ends either
//! with the game's result or with a redirect to another server.

use crate::client::view::ClientView;
use crate::error::{HubError, Result};
use crate::protocol::messages::{Message, PlayerMovePayload};
use crate::protocol::transport::MessageStream;
use crate::types::{Board, Cell, GameResult, BOARD_SIZE};
use crate::utils::parse_cell_selection;
use anyhow::Context;
use tracing::debug;

/// Where the client is in its conversation with the hub
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Connecting,
    AwaitingMessage,
    AwaitingLocalMove,
    Terminated,
    Switching { host: String },
}

/// How a session over one connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The game is over
    Finished(GameResult),
    /// The hub asked the client to continue on another server
    Switch(String),
}

/// Client-side view of one game
#[derive(Debug)]
pub struct ClientSession {
    board: Board,
    mark: Cell,
    state: ClientState,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSession {
    pub fn new() -> Self {
        Self {
            board: [Cell::Empty; BOARD_SIZE],
            mark: Cell::Empty,
            state: ClientState::Connecting,
        }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn mark(&self) -> Cell {
        self.mark
    }

    /// Dispatch messages from `stream` until the game ends or a redirect
    /// arrives
    pub async fn run(
        &mut self,
        stream: &mut dyn MessageStream,
        view: &mut dyn ClientView,
    ) -> Result<SessionOutcome> {
        self.state = ClientState::AwaitingMessage;

        loop {
            let message = stream
                .recv()
                .await
                .context("read json msg")?
                .ok_or_else(|| HubError::Transport {
                    message: "server closed the connection".to_string(),
                })?;

            debug!("Received '{}' message", message.kind());
            if let Some(outcome) = self.dispatch(message, stream, view).await? {
                return Ok(outcome);
            }
        }
    }

    async fn dispatch(
        &mut self,
        message: Message,
        stream: &mut dyn MessageStream,
        view: &mut dyn ClientView,
    ) -> Result<Option<SessionOutcome>> {
        match message {
            Message::StartGame(payload) => {
                self.mark = payload.cell_type;
                self.board = payload.board;
                view.show_board(&self.board, self.mark);
                self.state = ClientState::AwaitingMessage;
                Ok(None)
            }
            Message::RequestMove(_) => {
                self.request_move(stream, view)
                    .await
                    .context("handle request move action")?;
                Ok(None)
            }
            Message::PlayerMove(payload) => {
                let position = payload.position as usize;
                if position >= BOARD_SIZE {
                    return Err(HubError::ProtocolDecode {
                        expected: "player-move".to_string(),
                        reason: format!("position {} is off the board", payload.position),
                    }
                    .into());
                }

                self.board[position] = payload.cell_type;
                view.show_board(&self.board, self.mark);

                if let Some(result) = payload.game_result {
                    return Ok(Some(self.terminate(result, view)));
                }
                if payload.is_move_requested {
                    self.request_move(stream, view)
                        .await
                        .context("handle player move action")?;
                } else {
                    self.state = ClientState::AwaitingMessage;
                }
                Ok(None)
            }
            Message::Walkover(payload) => Ok(Some(self.terminate(payload.game_result, view))),
            Message::SwitchServer(payload) => {
                let host = payload.new_master_server;
                self.state = ClientState::Switching { host: host.clone() };
                Ok(Some(SessionOutcome::Switch(host)))
            }
        }
    }

    fn terminate(&mut self, result: GameResult, view: &mut dyn ClientView) -> SessionOutcome {
        view.show_result(result);
        self.state = ClientState::Terminated;
        SessionOutcome::Finished(result)
    }

    /// Prompt until the player names a cell, then send the move
    async fn request_move(
        &mut self,
        stream: &mut dyn MessageStream,
        view: &mut dyn ClientView,
    ) -> Result<()> {
        self.state = ClientState::AwaitingLocalMove;

        let position = loop {
            let input = view.read_move().await?.ok_or(HubError::InputClosed)?;
            match parse_cell_selection(&input) {
                Some(position) => break position,
                None => view.show_invalid_input(&input),
            }
        };

        stream
            .send(&Message::PlayerMove(PlayerMovePayload::new(
                self.mark, position,
            )))
            .await
            .context("write json msg")?;

        self.state = ClientState::AwaitingMessage;
        Ok(())
    }
}
