//! Common types used throughout the hub and the client

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unique identifier for connected clients
pub type ClientId = String;

/// Unique identifier for game sessions
pub type SessionId = String;

/// Number of cells on the board
pub const BOARD_SIZE: usize = 9;

/// Content of a single board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Cell {
    #[default]
    #[serde(rename = " ")]
    Empty,
    #[serde(rename = "X")]
    X,
    #[serde(rename = "O")]
    O,
}

impl Cell {
    /// Character used when rendering the board
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::X => 'X',
            Cell::O => 'O',
        }
    }

    /// The mark that moves after this one
    pub fn opponent(self) -> Cell {
        match self {
            Cell::X => Cell::O,
            Cell::O => Cell::X,
            Cell::Empty => Cell::Empty,
        }
    }

    pub fn is_mark(self) -> bool {
        !matches!(self, Cell::Empty)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The 3x3 board, row-major
pub type Board = [Cell; BOARD_SIZE];

/// Lifecycle of a game session. Only ever advances in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    ReadyToStart,
    InProgress,
    Finished,
}

impl std::fmt::Display for GameStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameStatus::ReadyToStart => write!(f, "ReadyToStart"),
            GameStatus::InProgress => write!(f, "InProgress"),
            GameStatus::Finished => write!(f, "Finished"),
        }
    }
}

/// Final outcome of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    XWins,
    OWins,
    Draw,
    /// The opponent left before the game was over
    Walkover,
}

impl GameResult {
    /// Result for a win by the given mark
    pub fn win_for(mark: Cell) -> Option<GameResult> {
        match mark {
            Cell::X => Some(GameResult::XWins),
            Cell::O => Some(GameResult::OWins),
            Cell::Empty => None,
        }
    }
}

impl std::fmt::Display for GameResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameResult::XWins => write!(f, "X wins!"),
            GameResult::OWins => write!(f, "O wins!"),
            GameResult::Draw => write!(f, "It's a draw!"),
            GameResult::Walkover => write!(f, "Your opponent left the game, you win by walkover!"),
        }
    }
}

/// Authoritative state of one game session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub player_x: ClientId,
    pub player_o: ClientId,
    pub current_move: Cell,
    pub status: GameStatus,
    /// Set once the game is finished
    #[serde(default)]
    pub result: Option<GameResult>,
}

impl GameState {
    /// A blank game with X to move first
    pub fn new(player_x: ClientId, player_o: ClientId) -> Self {
        Self {
            board: [Cell::Empty; BOARD_SIZE],
            player_x,
            player_o,
            current_move: Cell::X,
            status: GameStatus::ReadyToStart,
            result: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == GameStatus::Finished
    }
}

/// A mark placed on a cell, relayed between the two players of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub position: u8,
    pub mark: Cell,
}

/// Full copy of the session store, used for replication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub taken_at: DateTime<Utc>,
    pub sessions: HashMap<SessionId, GameState>,
}

impl StateSnapshot {
    pub fn new(sessions: HashMap<SessionId, GameState>) -> Self {
        Self {
            taken_at: Utc::now(),
            sessions,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
