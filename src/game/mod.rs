//! Tic-tac-toe rules and the engine that plays them over a connection

pub mod engine;
pub mod rules;

pub use engine::{GameEngine, RelayEngine};
