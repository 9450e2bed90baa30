//! Service layer for the tic-tac-toe hub
//!
//! This module contains the application state, the HTTP surface and the
//! replication consumer of the production service.

pub mod app;
pub mod health;
pub mod replication;
pub mod server;

pub use app::{AppState, ServiceError};
pub use health::{HealthCheck, HealthStatus};
pub use replication::{load_snapshot, SnapshotFileSink};
pub use server::{create_router, ServerState};
