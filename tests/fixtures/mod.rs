//! Test fixtures and mock implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tictactoe_hub::client::{ClientView, Connector};
use tictactoe_hub::error::{HubError, Result};
use tictactoe_hub::hub::{Player, SharedGameState};
use tictactoe_hub::protocol::{MemoryStream, Message, MessageStream};
use tictactoe_hub::types::{Board, Cell, GameResult, GameStatus};
use tictactoe_hub::GameEngine;
use tokio::task::JoinHandle;

/// Give a spawned task time to reach the queue before the next one
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

/// View that answers move prompts from a fixed script and records output
#[derive(Debug, Default)]
pub struct ScriptedView {
    inputs: VecDeque<String>,
    pub boards: Vec<Board>,
    pub results: Vec<GameResult>,
    pub invalid_inputs: Vec<String>,
    pub prompts: usize,
}

impl ScriptedView {
    pub fn new(inputs: &[&str]) -> Self {
        Self {
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }
}

#[async_trait]
impl ClientView for ScriptedView {
    fn show_board(&mut self, board: &Board, _mark: Cell) {
        self.boards.push(*board);
    }

    fn show_result(&mut self, result: GameResult) {
        self.results.push(result);
    }

    fn show_invalid_input(&mut self, input: &str) {
        self.invalid_inputs.push(input.to_string());
    }

    async fn read_move(&mut self) -> Result<Option<String>> {
        self.prompts += 1;
        Ok(self.inputs.pop_front())
    }
}

/// What a [`RecordingEngine`] was handed
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedSession {
    pub session_id: String,
    pub client_id: String,
    pub mark: Cell,
}

/// Rule engine that records each player and immediately finishes the game
#[derive(Debug, Default)]
pub struct RecordingEngine {
    played: Arc<Mutex<Vec<PlayedSession>>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<PlayedSession> {
        self.played
            .lock()
            .map(|played| played.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl GameEngine for RecordingEngine {
    async fn play(&self, player: Player, state: SharedGameState) -> Result<()> {
        if let Ok(mut played) = self.played.lock() {
            played.push(PlayedSession {
                session_id: player.session_id().to_string(),
                client_id: player.client_id().to_string(),
                mark: player.mark(),
            });
        }
        if let Ok(mut state) = state.write() {
            state.status = GameStatus::Finished;
            state.result = Some(GameResult::Draw);
        }
        Ok(())
    }
}

/// Messages a scripted server sends once a client connects
struct ServerScript {
    messages: Vec<Message>,
    /// Close the connection right after sending instead of listening
    hang_up: bool,
}

/// Connector backed by scripted in-memory servers.
///
/// Each port holds a queue of scripts; every connection consumes the next
/// one, sends all of its messages and records what the client sends back.
/// A port without a remaining script refuses the connection.
#[derive(Default)]
pub struct MockConnector {
    scripts: Mutex<HashMap<u16, VecDeque<ServerScript>>>,
    connections: Arc<Mutex<Vec<u16>>>,
    received: Arc<Mutex<Vec<(u16, Message)>>>,
    servers: Mutex<Vec<JoinHandle<()>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next connection to `port`
    pub fn script(self, port: u16, messages: Vec<Message>) -> Self {
        self.push_script(port, ServerScript { messages, hang_up: false })
    }

    /// Like [`MockConnector::script`], but the server drops the connection
    /// after its last message
    pub fn script_then_hang_up(self, port: u16, messages: Vec<Message>) -> Self {
        self.push_script(port, ServerScript { messages, hang_up: true })
    }

    fn push_script(self, port: u16, script: ServerScript) -> Self {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(port).or_default().push_back(script);
        }
        self
    }

    /// Ports dialled so far, in order
    pub fn connections(&self) -> Vec<u16> {
        self.connections
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Wait for every scripted server to see its client hang up, then
    /// return what the clients sent
    pub async fn received(&self) -> Vec<(u16, Message)> {
        let servers: Vec<JoinHandle<()>> = self
            .servers
            .lock()
            .map(|mut servers| servers.drain(..).collect())
            .unwrap_or_default();
        for server in servers {
            let _ = server.await;
        }
        self.received
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, port: u16) -> Result<Box<dyn MessageStream>> {
        if let Ok(mut connections) = self.connections.lock() {
            connections.push(port);
        }

        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.get_mut(&port).and_then(|s| s.pop_front()));
        let Some(script) = script else {
            return Err(HubError::Transport {
                message: format!("connection refused on port {}", port),
            }
            .into());
        };

        let (client_end, mut server_end) = MemoryStream::pair();
        let received = self.received.clone();
        let server = tokio::spawn(async move {
            for message in &script.messages {
                if server_end.send(message).await.is_err() {
                    return;
                }
            }
            if script.hang_up {
                let _ = server_end.close().await;
                return;
            }
            while let Ok(Some(message)) = server_end.recv().await {
                if let Ok(mut received) = received.lock() {
                    received.push((port, message));
                }
            }
        });

        if let Ok(mut servers) = self.servers.lock() {
            servers.push(server);
        }
        Ok(Box::new(client_end))
    }
}
