use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Serialize;
use std::time::Instant;
use utoipa::ToSchema;

use crate::handlers::AppState;

/// Tracks application start time for uptime calculation
static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize the start time (call this on application startup)
pub fn init_start_time() {
    let _ = START_TIME.get_or_init(Instant::now);
}

fn get_uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    pub message: String,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: ComponentStatus,
    pub version: String,
    pub uptime_secs: u64,
    /// Absent when the service runs on fixture data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ComponentHealth>,
    pub cache: ComponentHealth,
}

fn component(result: Result<(), String>, started: Instant) -> ComponentHealth {
    let latency_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => ComponentHealth {
            status: ComponentStatus::Up,
            message: "Connection successful".to_string(),
            latency_ms,
        },
        Err(e) => ComponentHealth {
            status: ComponentStatus::Down,
            message: format!("Connection failed: {}", e),
            latency_ms,
        },
    }
}

/// Basic liveness probe
async fn liveness_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "up",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Readiness probe: database (when configured) and cache backend
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(db) => {
            let started = Instant::now();
            let result = crate::db::check_connection(db).await.map_err(|e| e.to_string());
            Some(component(result, started))
        }
        None => None,
    };

    let started = Instant::now();
    let cache_result = state
        .cache
        .exists("health:probe")
        .await
        .map(|_| ())
        .map_err(|e| e.to_string());
    let cache = component(cache_result, started);

    let all_up = cache.status == ComponentStatus::Up
        && database
            .as_ref()
            .map_or(true, |db| db.status == ComponentStatus::Up);
    let (code, status) = if all_up {
        (StatusCode::OK, ComponentStatus::Up)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, ComponentStatus::Down)
    };

    (
        code,
        Json(ReadinessResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: get_uptime_secs(),
            database,
            cache,
        }),
    )
}

/// Creates the router for health check endpoints
///
/// Endpoints:
/// - GET /health       - Liveness probe
/// - GET /health/ready - Readiness probe (database and cache)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(liveness_check))
        .route("/ready", get(readiness_check))
}
