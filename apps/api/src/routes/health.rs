use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version, and the active model quota.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let throttle = state.pipeline.throttle();
    let in_window = throttle.admissions_in_window().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "ats-api",
        "model": state.config.gemini_model,
        "quota": {
            "max_calls": throttle.config().max_calls(),
            "window_secs": throttle.config().window().as_secs(),
            "in_window": in_window,
        }
    }))
}
