//! Metrics and monitoring for the tic-tac-toe hub
//!
//! Prometheus metrics for the session store, matchmaking queue and state
//! replication. They are served on `/metrics` by the service router.

pub mod collector;

pub use collector::{
    MatchmakingMetrics, MetricsCollector, ReplicationMetrics, ServiceMetrics, SessionMetrics,
};
