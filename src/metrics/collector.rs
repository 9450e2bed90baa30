//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the tic-tac-toe hub: session
//! lifecycle, matchmaking queue activity, and state replication.

use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::Duration;

/// Main metrics collector for the hub
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Session store metrics
    session_metrics: SessionMetrics,

    /// Matchmaking queue metrics
    matchmaking_metrics: MatchmakingMetrics,

    /// Replication metrics
    replication_metrics: ReplicationMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Websocket connections accepted
    pub connections_total: IntCounter,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,
}

/// Session store metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Sessions currently in the store, by status
    pub sessions: IntGaugeVec,

    /// Total sessions created
    pub sessions_created_total: IntCounter,

    /// Total finished sessions pruned
    pub sessions_pruned_total: IntCounter,

    /// Games handed to the rule engine, by outcome
    pub games_played_total: IntCounterVec,
}

/// Matchmaking queue metrics
#[derive(Clone)]
pub struct MatchmakingMetrics {
    /// Clients currently waiting for an opponent
    pub clients_waiting: IntGauge,

    /// Total clients matched into a session
    pub clients_matched_total: IntCounter,

    /// Queue entries discarded because their caller withdrew
    pub entries_abandoned_total: IntCounter,

    /// Time a client waited before being matched
    pub match_wait_seconds: Histogram,
}

/// Replication metrics
#[derive(Clone)]
pub struct ReplicationMetrics {
    /// Snapshots handed to the replication consumer
    pub snapshots_published_total: IntCounter,

    /// Snapshots adopted from an external authority
    pub snapshots_applied_total: IntCounter,

    /// Sessions contained in the last published snapshot
    pub last_snapshot_sessions: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;
        let matchmaking_metrics = MatchmakingMetrics::new(&registry)?;
        let replication_metrics = ReplicationMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            session_metrics,
            matchmaking_metrics,
            replication_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Get service metrics
    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    /// Get session metrics
    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    /// Get matchmaking metrics
    pub fn matchmaking(&self) -> &MatchmakingMetrics {
        &self.matchmaking_metrics
    }

    /// Get replication metrics
    pub fn replication(&self) -> &ReplicationMetrics {
        &self.replication_metrics
    }

    /// Record a session being allocated for a matched pair
    pub fn record_session_created(&self, wait: Duration) {
        self.session_metrics.sessions_created_total.inc();
        self.matchmaking_metrics.clients_matched_total.inc_by(2);
        self.matchmaking_metrics
            .match_wait_seconds
            .observe(wait.as_secs_f64());
    }

    /// Record finished sessions removed by a prune
    pub fn record_sessions_pruned(&self, count: usize) {
        self.session_metrics
            .sessions_pruned_total
            .inc_by(count as u64);
    }

    /// Refresh the per-status session gauges
    pub fn update_session_counts(&self, ready: usize, in_progress: usize, finished: usize) {
        let gauges = &self.session_metrics.sessions;
        gauges.with_label_values(&["ready_to_start"]).set(ready as i64);
        gauges
            .with_label_values(&["in_progress"])
            .set(in_progress as i64);
        gauges.with_label_values(&["finished"]).set(finished as i64);
    }

    /// Record the rule engine returning for one player
    pub fn record_game_played(&self, success: bool) {
        let outcome = if success { "completed" } else { "failed" };
        self.session_metrics
            .games_played_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Record a queue entry discarded before pairing
    pub fn record_entry_abandoned(&self) {
        self.matchmaking_metrics.entries_abandoned_total.inc();
    }

    /// Record a snapshot published to the replication consumer
    pub fn record_snapshot_published(&self, sessions: usize) {
        self.replication_metrics.snapshots_published_total.inc();
        self.replication_metrics
            .last_snapshot_sessions
            .set(sessions as i64);
    }

    /// Record a snapshot adopted from outside
    pub fn record_snapshot_applied(&self) {
        self.replication_metrics.snapshots_applied_total.inc();
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("tictactoe_hub_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let connections_total = IntCounter::new(
            "tictactoe_hub_connections_total",
            "Total websocket connections accepted",
        )?;
        registry.register(Box::new(connections_total.clone()))?;

        let health_status = IntGauge::new(
            "tictactoe_hub_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        Ok(Self {
            uptime_seconds,
            connections_total,
            health_status,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let sessions = IntGaugeVec::new(
            Opts::new("tictactoe_hub_sessions", "Sessions in the store by status"),
            &["status"],
        )?;
        registry.register(Box::new(sessions.clone()))?;

        let sessions_created_total = IntCounter::new(
            "tictactoe_hub_sessions_created_total",
            "Total sessions created",
        )?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let sessions_pruned_total = IntCounter::new(
            "tictactoe_hub_sessions_pruned_total",
            "Total finished sessions pruned",
        )?;
        registry.register(Box::new(sessions_pruned_total.clone()))?;

        let games_played_total = IntCounterVec::new(
            Opts::new(
                "tictactoe_hub_games_played_total",
                "Games handed to the rule engine by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(games_played_total.clone()))?;

        Ok(Self {
            sessions,
            sessions_created_total,
            sessions_pruned_total,
            games_played_total,
        })
    }
}

impl MatchmakingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let clients_waiting = IntGauge::new(
            "tictactoe_hub_clients_waiting",
            "Clients currently waiting for an opponent",
        )?;
        registry.register(Box::new(clients_waiting.clone()))?;

        let clients_matched_total = IntCounter::new(
            "tictactoe_hub_clients_matched_total",
            "Total clients matched into a session",
        )?;
        registry.register(Box::new(clients_matched_total.clone()))?;

        let entries_abandoned_total = IntCounter::new(
            "tictactoe_hub_queue_entries_abandoned_total",
            "Queue entries discarded because the caller withdrew",
        )?;
        registry.register(Box::new(entries_abandoned_total.clone()))?;

        let match_wait_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "tictactoe_hub_match_wait_seconds",
                "Time a client waited before being matched",
            )
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0]),
        )?;
        registry.register(Box::new(match_wait_seconds.clone()))?;

        Ok(Self {
            clients_waiting,
            clients_matched_total,
            entries_abandoned_total,
            match_wait_seconds,
        })
    }
}

impl ReplicationMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let snapshots_published_total = IntCounter::new(
            "tictactoe_hub_snapshots_published_total",
            "Snapshots handed to the replication consumer",
        )?;
        registry.register(Box::new(snapshots_published_total.clone()))?;

        let snapshots_applied_total = IntCounter::new(
            "tictactoe_hub_snapshots_applied_total",
            "Snapshots adopted from an external authority",
        )?;
        registry.register(Box::new(snapshots_applied_total.clone()))?;

        let last_snapshot_sessions = IntGauge::new(
            "tictactoe_hub_last_snapshot_sessions",
            "Sessions contained in the last published snapshot",
        )?;
        registry.register(Box::new(last_snapshot_sessions.clone()))?;

        Ok(Self {
            snapshots_published_total,
            snapshots_applied_total,
            last_snapshot_sessions,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
