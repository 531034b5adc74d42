//! POST /predict
//!
//! Pipeline failures are reported as `{"error": "..."}` with HTTP 200 so existing
//! clients keep working. Only a misconfigured deployment changes the status code.

use crate::{
    error::{ApiError, ErrorEnvelope},
    state::AppState,
};
use axum::{Json, extract::State};
use lens_inference::{PipelineError, PredictionResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PredictResponse {
    Results { results: PredictionResult },
    Error(ErrorEnvelope),
}

#[tracing::instrument(name = "POST /predict", skip(state))]
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, ApiError> {
    let started = Instant::now();
    let outcome = state.pipeline.predict(&request.url).await;
    metrics::histogram!("prediction_duration_seconds").record(started.elapsed().as_secs_f64());

    match outcome {
        Ok(results) => {
            metrics::counter!("predictions_total", "outcome" => "ok").increment(1);
            Ok(Json(PredictResponse::Results { results }))
        }
        Err(err) => {
            metrics::counter!("predictions_total", "outcome" => err.kind()).increment(1);
            match &err {
                PipelineError::Configuration(_) => {
                    return Err(ApiError::misconfigured(err.to_string()));
                }
                PipelineError::Inference(_) => {
                    tracing::error!(url = %request.url, "Model evaluation failed: {}", err)
                }
                PipelineError::Fetch(_) | PipelineError::Decode(_) => {
                    tracing::warn!(url = %request.url, "Prediction rejected: {}", err)
                }
            }
            Ok(Json(PredictResponse::Error(ErrorEnvelope::new(err.to_string()))))
        }
    }
}
