//! Client/server wire protocol
//!
//! This module defines the tagged JSON messages exchanged over the game socket
//! and the transport trait both sides use to exchange them.

pub mod messages;
pub mod transport;

// Re-export commonly used types
pub use messages::{
    Message, PlayerMovePayload, RequestMovePayload, StartGamePayload, SwitchServerPayload,
    WalkoverPayload,
};
pub use transport::{ClientSocket, MemoryStream, MessageStream, ServerSocket};
