//! Tic-tac-toe hub - matchmaking and game-state hub with client failover
//!
//! The hub pairs waiting clients into two-player sessions, keeps the
//! authoritative state of every game, and periodically publishes snapshots
//! for a standby. The client side follows a small state machine that
//! survives the controlling server being switched.

pub mod client;
pub mod config;
pub mod error;
pub mod game;
pub mod hub;
pub mod metrics;
pub mod protocol;
pub mod service;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{HubError, Result};
pub use types::*;

// Re-export key components
pub use client::{ClientView, FailoverClient, TerminalView, WsConnector};
pub use game::{GameEngine, RelayEngine};
pub use hub::{Client, Hub, MatchmakingQueue, Player, SessionStore, StateSynchronizer};
pub use protocol::{Message, MessageStream};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
