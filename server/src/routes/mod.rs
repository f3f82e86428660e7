//! HTTP routes

pub mod health;
pub mod info;
pub mod predict;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

/// Build the application router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(info::service_info))
        .route("/health", get(health::health_check))
        .route("/invocations", post(predict::invocations))
        .route("/predict_names", post(predict::predict_names))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, OnceLock};

    use axum::body::to_bytes;
    use axum::response::Response;
    use iris_lifecycle::dataset::IrisDataset;
    use iris_lifecycle::inference::{LoadedModel, ModelInfo, PredictionService};
    use iris_lifecycle::model::{LogisticRegression, LogisticRegressionConfig};
    use iris_lifecycle::IrisError;

    use crate::state::{AppState, SharedState};

    fn fitted() -> LogisticRegression {
        static MODEL: OnceLock<LogisticRegression> = OnceLock::new();
        MODEL
            .get_or_init(|| {
                let dataset = IrisDataset::builtin().unwrap();
                LogisticRegression::fit(dataset.samples(), LogisticRegressionConfig::default())
                    .unwrap()
            })
            .clone()
    }

    pub fn loaded_state() -> SharedState {
        let model = LoadedModel::new(Arc::new(fitted()), ModelInfo::in_memory("logistic_regression"));
        Arc::new(AppState::new(PredictionService::with_model(model)))
    }

    pub fn empty_state() -> SharedState {
        let service =
            PredictionService::unavailable(IrisError::Tracking("no runs recorded".to_string()));
        Arc::new(AppState::new(service))
    }

    pub async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
