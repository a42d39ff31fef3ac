use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;
use crate::vocabulary::WordStore;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(health_check))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/store", get(store_health))
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "uptimeSecs": state.uptime_secs(),
        "workingSet": {
            "initializing": state.selector().is_initializing(),
        },
        "caches": {
            "queryEntries": state.query_cache().len(),
            "translationEntries": state.memoizer().len(),
        }
    }))
}

pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// 存储可读即视为就绪
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().any_user() {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness probe failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn store_health(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let words = state.store().any_words().await;
    let latency_us = start.elapsed().as_micros() as u64;

    Json(serde_json::json!({
        "healthy": words.is_ok(),
        "hasWords": words.unwrap_or(false),
        "latencyUs": latency_us,
    }))
}
