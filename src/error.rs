//! Error types for the tic-tac-toe hub
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application.

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific hub and client scenarios
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("Enqueue cancelled for client: {client_id}")]
    EnqueueCancelled { client_id: String },

    #[error("No opponent found for client {client_id} within {seconds}s")]
    MatchTimeout { client_id: String, seconds: u64 },

    #[error("Matchmaking queue is closed")]
    QueueClosed,

    #[error("Invalid move: {reason}")]
    InvalidMove { reason: String },

    #[error("Failed to decode '{expected}' message: {reason}")]
    ProtocolDecode { expected: String, reason: String },

    #[error("Unexpected message: {message}")]
    UnexpectedMessage { message: String },

    #[error("Undefined master server: {host}")]
    UnknownMasterServer { host: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },

    #[error("Local input closed")]
    InputClosed,

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Internal service error: {message}")]
    InternalError { message: String },
}
