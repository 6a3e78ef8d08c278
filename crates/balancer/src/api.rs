//! HTTP API for routing decisions, forecasts, health checks and Prometheus metrics

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use balancer_lib::{
    health::{ComponentStatus, HealthRegistry},
    random::{RandomSource, ThreadRandom},
    BalancerMetrics, DecisionEngine, MetricsUpdate, SelectionMode,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Strategy name reported with every routing decision
pub const STRATEGY: &str = "predictive_load_balancing";

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
    pub health_registry: HealthRegistry,
    pub metrics: BalancerMetrics,
    /// Used to pick simulated spike sizes
    pub random: Arc<dyn RandomSource>,
}

impl AppState {
    pub fn new(
        engine: Arc<DecisionEngine>,
        health_registry: HealthRegistry,
        metrics: BalancerMetrics,
    ) -> Self {
        Self {
            engine,
            health_registry,
            metrics,
            random: Arc::new(ThreadRandom),
        }
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResponse {
    pub server: String,
    pub strategy: String,
    pub mode: SelectionMode,
    pub predicted_traffic: f64,
    pub current_traffic: f64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub current_traffic: f64,
    pub predicted_traffic: f64,
    pub traffic_spike_detected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficRequest {
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficResponse {
    pub recorded: f64,
    pub spike: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeResponse {
    pub message: String,
    pub new_traffic: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Route one request to a backend server
async fn route(State(state): State<Arc<AppState>>) -> Response {
    let decision = state.engine.decide();
    state
        .health_registry
        .record_routing(decision.as_ref().map(|d| d.mode))
        .await;

    match decision {
        Some(decision) => Json(RouteResponse {
            message: format!("Request routed to {}", decision.server_id),
            server: decision.server_id,
            strategy: STRATEGY.to_string(),
            mode: decision.mode,
            predicted_traffic: decision.predicted_traffic,
            current_traffic: state.engine.current_traffic(),
        })
        .into_response(),
        None => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "No healthy servers available",
        ),
    }
}

async fn predict(State(state): State<Arc<AppState>>) -> Json<PredictResponse> {
    let current_traffic = state.engine.current_traffic();
    Json(PredictResponse {
        current_traffic,
        predicted_traffic: state.engine.forecast_traffic(),
        traffic_spike_detected: state.engine.is_spike(current_traffic),
    })
}

async fn record_traffic(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TrafficRequest>,
) -> Json<TrafficResponse> {
    let spike = state.engine.record_traffic(request.value);
    Json(TrafficResponse {
        recorded: state.engine.current_traffic(),
        spike,
    })
}

async fn list_servers(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.all_server_snapshots())
}

async fn get_server(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.engine.server_snapshot(&id) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("Unknown server: {}", id)),
    }
}

async fn report_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<MetricsUpdate>,
) -> impl IntoResponse {
    let stored = state.engine.update_server_metrics(&id, update);
    state
        .health_registry
        .record_server_count(state.engine.monitor().len())
        .await;
    Json(stored)
}

async fn dashboard_data(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.dashboard())
}

/// Record a burst of 600 to 900 requests per second
async fn simulate_spike(State(state): State<Arc<AppState>>) -> Json<SpikeResponse> {
    let value = (600 + state.random.index(301)) as f64;
    state.engine.record_traffic(value);
    info!(traffic = value, "Traffic spike simulated");

    Json(SpikeResponse {
        message: "Traffic spike simulated".to_string(),
        new_traffic: value,
    })
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still operational
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/route", get(route))
        .route("/predict", get(predict))
        .route("/traffic", post(record_traffic))
        .route("/servers", get(list_servers))
        .route("/servers/:id", get(get_server))
        .route("/servers/:id/metrics", post(report_metrics))
        .route("/dashboard_data", get(dashboard_data))
        .route("/simulate_spike", post(simulate_spike))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server on `port` until shutdown
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, state, shutdown).await
}

/// Serve the API on an already bound listener until shutdown
pub async fn serve_on(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let app = create_router(state);
    info!(addr = %listener.local_addr()?, "Starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    Ok(())
}
