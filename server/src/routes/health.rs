//! Health check endpoint

use axum::{extract::State, http::StatusCode, Json};

use iris_lifecycle::inference::HealthReport;

use crate::state::SharedState;

/// GET /health - 200 when a model is loaded, 500 otherwise
pub async fn health_check(State(state): State<SharedState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.service.health();
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(report))
}
