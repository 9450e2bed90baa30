//! HTTP surface of the hub: the game websocket plus health, Prometheus
//! metrics and stats endpoints, served with Axum.

use crate::hub::{Client, Hub};
use crate::metrics::MetricsCollector;
use crate::protocol::ServerSocket;
use crate::service::health::{HealthCheck, HealthStatus};
use anyhow::Result;
use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Shared state for every route
#[derive(Clone)]
pub struct ServerState {
    pub hub: Hub,
    pub metrics: Arc<MetricsCollector>,
    pub service_name: String,
    pub started_at: Instant,
    /// Cancelled when the service begins shutting down
    pub shutdown: CancellationToken,
}

/// Create the Axum router with the game and monitoring endpoints
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/game", get(game_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Serve the router until the shutdown token fires
pub async fn serve(listener: TcpListener, state: ServerState) -> Result<()> {
    let addr = listener.local_addr()?;
    let shutdown = state.shutdown.clone();
    let app = create_router(state);

    info!("Hub listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("HTTP server shutdown signal received");
        })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Root endpoint handler - shows service information
async fn root_handler(State(state): State<ServerState>) -> impl IntoResponse {
    Json(json!({
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/game", "/health", "/ready", "/metrics", "/stats"]
    }))
}

/// Upgrade to a websocket and hand the connection to the hub
async fn game_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| serve_client(state, socket))
}

async fn serve_client(state: ServerState, socket: WebSocket) {
    state.metrics.service().connections_total.inc();

    let client = Client::new(Box::new(ServerSocket::new(socket)));
    let client_id = client.id().to_string();
    info!("Client '{}' connected", client_id);

    let cancel = state.shutdown.child_token();
    match state.hub.handle_with_cancel(client, cancel).await {
        Ok(()) => info!("Client '{}' finished its game", client_id),
        Err(e) => warn!("Client '{}' left: {:#}", client_id, e),
    }
}

/// Lightweight health check endpoint handler
async fn health_handler(State(state): State<ServerState>) -> impl IntoResponse {
    debug!("Health check requested");

    let status = HealthCheck::liveness_check(&state);
    let code = match status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": state.service_name,
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint handler
async fn ready_handler(State(state): State<ServerState>) -> impl IntoResponse {
    match HealthCheck::readiness_check(&state) {
        HealthStatus::Healthy => (StatusCode::OK, "Ready"),
        HealthStatus::Degraded => (StatusCode::OK, "Degraded but ready"),
        HealthStatus::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "Not ready"),
    }
}

/// Prometheus metrics endpoint handler
async fn metrics_handler(State(state): State<ServerState>) -> Response {
    debug!("Metrics endpoint requested");

    let metric_families = state.metrics.registry().gather();
    let encoder = TextEncoder::new();

    match encoder.encode_to_string(&metric_families) {
        Ok(metrics_output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            metrics_output,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to encode metrics".to_string(),
            )
                .into_response()
        }
    }
}

/// Session store summary (for debugging/human consumption)
async fn stats_handler(State(state): State<ServerState>) -> impl IntoResponse {
    let health = HealthCheck::check(&state);
    let code = match health.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };

    (
        code,
        Json(json!({
            "service": {
                "name": health.service,
                "version": health.version,
                "status": health.status,
                "uptime_seconds": health.stats.uptime_seconds
            },
            "sessions": {
                "ready_to_start": health.stats.sessions_ready,
                "in_progress": health.stats.sessions_in_progress,
                "finished": health.stats.sessions_finished,
                "created": health.stats.sessions_created
            },
            "clients_waiting": health.stats.clients_waiting,
            "components": health.checks,
            "timestamp": health.timestamp
        })),
    )
}
