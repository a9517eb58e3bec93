use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Reports service version and whether the document store answers a ping.
pub async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let (status, health, store) = match state.repo.ping().await {
        Ok(()) => (StatusCode::OK, "ok", "up"),
        Err(e) => {
            tracing::warn!("Health check: store ping failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
        }
    };

    (
        status,
        Json(json!({
            "status": health,
            "version": env!("CARGO_PKG_VERSION"),
            "service": "matching-api",
            "database": state.config.db_name,
            "store": store
        })),
    )
}
