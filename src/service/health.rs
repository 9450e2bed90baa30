//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the hub, including
//! readiness and liveness probes.

use crate::service::server::ServerState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::error;

/// Health check status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// Value reported on the health status gauge
    pub fn gauge_value(self) -> u8 {
        match self {
            HealthStatus::Healthy => 2,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 0,
        }
    }

    fn worst(self, other: HealthStatus) -> HealthStatus {
        if other.gauge_value() < self.gauge_value() {
            other
        } else {
            self
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Crate version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Sessions matched but not yet started
    pub sessions_ready: usize,
    /// Sessions being played
    pub sessions_in_progress: usize,
    /// Finished sessions awaiting the next prune
    pub sessions_finished: usize,
    /// Clients waiting for an opponent
    pub clients_waiting: i64,
    /// Sessions created since service start
    pub sessions_created: u64,
    /// Seconds since the service started
    pub uptime_seconds: u64,
}

impl HealthCheck {
    /// Perform a comprehensive health check of the service
    pub fn check(state: &ServerState) -> Self {
        let checks = vec![
            Self::check_service_running(state),
            Self::check_session_store(state),
        ];
        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |status, check| status.worst(check.status));

        state
            .metrics
            .update_health_status(status.gauge_value());

        HealthCheck {
            status,
            service: state.service_name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(state),
        }
    }

    /// Simple liveness check - just verify service is running
    pub fn liveness_check(state: &ServerState) -> HealthStatus {
        if state.shutdown.is_cancelled() {
            HealthStatus::Unhealthy
        } else {
            HealthStatus::Healthy
        }
    }

    /// Readiness check - verify service can handle requests
    pub fn readiness_check(state: &ServerState) -> HealthStatus {
        Self::liveness_check(state).worst(Self::check_session_store(state).status)
    }

    fn check_service_running(state: &ServerState) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match Self::liveness_check(state) {
            HealthStatus::Healthy => (HealthStatus::Healthy, None),
            status => (status, Some("Service is shutting down".to_string())),
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn check_session_store(state: &ServerState) -> ComponentCheck {
        let start = Instant::now();

        let (status, message) = match state.hub.store().stats() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(e) => {
                error!("Session store check failed: {}", e);
                (HealthStatus::Unhealthy, Some(e.to_string()))
            }
        };

        ComponentCheck {
            name: "session_store".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn gather_service_stats(state: &ServerState) -> ServiceStats {
        let store = state.hub.store().stats().unwrap_or_default();
        ServiceStats {
            sessions_ready: store.ready_to_start,
            sessions_in_progress: store.in_progress,
            sessions_finished: store.finished,
            clients_waiting: state.metrics.matchmaking().clients_waiting.get(),
            sessions_created: state.metrics.session().sessions_created_total.get(),
            uptime_seconds: state.started_at.elapsed().as_secs(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}
