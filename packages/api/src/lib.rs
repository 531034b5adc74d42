use std::sync::Arc;

use axum::{
    Json, Router,
    http::Uri,
    routing::{get, post},
};
use error::ApiError;
use serde_json::{Value, json};
use state::State;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod entity;
pub mod error;
pub mod repository;
mod routes;
pub mod state;

pub use axum;
pub use routes::predict::{PredictRequest, PredictResponse};
pub use sea_orm;

pub fn construct_router(state: Arc<State>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/predict", post(routes::predict::predict))
        .merge(routes::student::routes())
        .nest("/health", routes::health::routes())
        .fallback(fallback)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tracing::instrument(name = "GET /")]
async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
