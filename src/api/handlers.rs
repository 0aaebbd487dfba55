use std::collections::HashMap;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::core::metrics;
use crate::core::redis::RedisHealth;
use crate::core::state::AppState;
use crate::repositories;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let api = state.settings().api();
    Json(RootResponse { message: api.project_name.clone(), version: api.version.clone() })
}

/// Database failures make the service unhealthy; Redis only degrades it,
/// since it backs nothing but login throttling.
pub(crate) async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let redis = match state.redis().health().await {
        RedisHealth::Healthy => ("healthy".to_string(), false),
        RedisHealth::Disconnected => ("disconnected".to_string(), false),
        RedisHealth::Unhealthy(error) => (format!("unhealthy: {error}"), true),
    };
    let database = match repositories::health::ping(state.db()).await {
        Ok(()) => ("healthy".to_string(), false),
        Err(err) => (format!("unhealthy: {err}"), true),
    };

    let status = match (database.1, redis.1) {
        (true, _) => "unhealthy",
        (false, true) => "degraded",
        (false, false) => "healthy",
    };

    let components = HashMap::from([
        ("database".to_string(), database.0),
        ("redis".to_string(), redis.0),
        ("presence_rooms".to_string(), state.presence().room_count().to_string()),
    ]);

    Json(HealthResponse { service: "quizroom".to_string(), status: status.to_string(), components })
}

pub(crate) async fn metrics(State(state): State<AppState>) -> Response {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(body) = metrics::render() else {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    };
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response()
}
