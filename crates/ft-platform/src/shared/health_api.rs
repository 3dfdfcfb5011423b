//! Health Check Endpoints
//!
//! - /health - Combined health status
//! - /health/live - Liveness probe

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: HealthStatus,
}

#[derive(Clone)]
pub struct HealthState {
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl HealthState {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            started_at: Utc::now(),
        }
    }
}

pub async fn get_health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Up,
        timestamp: Utc::now(),
        version: state.version,
        started_at: state.started_at,
    })
}

pub async fn get_liveness() -> Json<SimpleHealthResponse> {
    Json(SimpleHealthResponse { status: HealthStatus::Up })
}

/// Health routes, usable under any outer router state.
pub fn health_router<S>(state: HealthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/health", get(get_health))
        .route("/health/live", get(get_liveness))
        .with_state(state)
}
