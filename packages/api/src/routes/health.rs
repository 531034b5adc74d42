use crate::state::AppState;
use axum::{Json, Router, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// The pipeline is fully loaded before the listener binds, so every probe is static.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/startup", get(startup))
}

fn health(status: &str) -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

async fn liveness() -> (StatusCode, Json<HealthResponse>) {
    health("healthy")
}

async fn readiness() -> (StatusCode, Json<HealthResponse>) {
    health("ready")
}

async fn startup() -> (StatusCode, Json<HealthResponse>) {
    health("started")
}
