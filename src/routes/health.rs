use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

// Liveness check
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness check: DB connectivity (with timeout) and purge scheduler health
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    if state.purge.failed() {
        return (StatusCode::SERVICE_UNAVAILABLE, "not ready: purge scheduler stopped").into_response();
    }
    let Some(db) = &state.db else {
        return (StatusCode::OK, "ready").into_response();
    };
    let query = sqlx::query("SELECT 1").fetch_one(db);
    match tokio::time::timeout(std::time::Duration::from_secs(5), query).await {
        Ok(Ok(_)) => (StatusCode::OK, "ready").into_response(),
        Ok(Err(e)) => {
            tracing::warn!("Readiness check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "not ready: database").into_response()
        }
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

// Metrics endpoint: returns JSON snapshot plus purge scheduler state
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_snapshot();
    Json(json!({
        "counters": snapshot,
        "purge_scheduler": state.purge.state(),
    }))
}

pub async fn version() -> impl IntoResponse {
    let body = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
