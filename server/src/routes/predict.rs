//! Prediction endpoints
//!
//! Bodies are taken as raw bytes and handed to the service, so a missing
//! model is reported before any JSON parsing happens.

use axum::{body::Bytes, extract::State, Json};

use iris_lifecycle::inference::{NamedPredictResponse, PredictResponse};

use crate::error::ApiError;
use crate::state::SharedState;

/// POST /invocations - Class ids for each instance
pub async fn invocations(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    Ok(Json(state.service.predict(&body)?))
}

/// POST /predict_names - Class ids and species names for each instance
pub async fn predict_names(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<Json<NamedPredictResponse>, ApiError> {
    Ok(Json(state.service.predict_with_names(&body)?))
}
