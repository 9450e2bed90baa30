//! Configuration management for the tic-tac-toe hub
//!
//! This module handles configuration loading from TOML files and environment
//! variables, validation, and default values for the hub and its clients.

pub mod app;
pub mod servers;

// Re-export commonly used types
pub use app::{
    validate_config, AppConfig, ClientSettings, HubSettings, ReplicationSettings, ServiceSettings,
};
pub use servers::{AddressBook, ServerEntry};
