//! Matchmaking and game-state hub
//!
//! The hub pairs waiting clients, owns every live session in the
//! [`SessionStore`], and periodically prunes and publishes the store for
//! replication.

pub mod facade;
pub mod player;
pub mod queue;
pub mod store;
pub mod sync;

pub use facade::Hub;
pub use player::{Client, Player};
pub use queue::{MatchmakingQueue, QueueConfig};
pub use store::{SessionStore, SharedGameState, StoreStats};
pub use sync::{StateSynchronizer, TickReport};
