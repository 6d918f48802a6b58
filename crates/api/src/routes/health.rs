use axum::{Json, Router, routing::get};
use serde_json::{Value, json};

use crate::state::AppState;

/// Liveness probe.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
