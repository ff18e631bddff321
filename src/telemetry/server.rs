//! Telemetry Server
//!
//! Serves the prometheus scrape endpoint alongside health probes. Runs on its
//! own task and shares nothing with the watch loop except the counters.

use super::metrics::{MetricsSnapshot, TaggerMetrics};
use crate::error::{Error, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

// =============================================================================
// Server Configuration
// =============================================================================

/// Default scrape port
pub const DEFAULT_METRICS_PORT: u16 = 2112;

/// Configuration for the telemetry server
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Bind address
    pub addr: SocketAddr,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_METRICS_PORT)),
        }
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Body of `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub version: String,
    pub dry_run: bool,
    pub counters: MetricsSnapshot,
}

/// Shared handler state
#[derive(Clone)]
struct TelemetryState {
    registry: Registry,
    metrics: TaggerMetrics,
    dry_run: bool,
}

// =============================================================================
// Telemetry Server
// =============================================================================

/// HTTP server exposing `/metrics`, `/status`, `/healthz` and `/readyz`
pub struct TelemetryServer {
    config: TelemetryConfig,
    state: TelemetryState,
    shutdown_tx: broadcast::Sender<()>,
}

impl TelemetryServer {
    /// Create a new telemetry server
    pub fn new(
        config: TelemetryConfig,
        registry: Registry,
        metrics: TaggerMetrics,
        dry_run: bool,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            state: TelemetryState {
                registry,
                metrics,
                dry_run,
            },
            shutdown_tx,
        }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(scrape_metrics))
            .route("/status", get(status))
            .route("/healthz", get(health_check))
            .route("/readyz", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until [`TelemetryServer::shutdown`] is called
    pub async fn run(&self) -> Result<()> {
        let app = self.router();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(|e| Error::Internal(format!("Failed to bind telemetry server: {}", e)))?;

        info!("Telemetry server listening on {}", self.config.addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("Telemetry server shutting down");
            })
            .await
            .map_err(|e| Error::Internal(format!("Telemetry server error: {}", e)))?;

        Ok(())
    }

    /// Trigger graceful shutdown
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn scrape_metrics(State(state): State<TelemetryState>) -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&state.registry.gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

async fn status(State(state): State<TelemetryState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        version: crate::VERSION.to_string(),
        dry_run: state.dry_run,
        counters: state.metrics.snapshot(),
    })
}

async fn health_check() -> &'static str {
    "ok"
}
