//! Service metadata endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use iris_lifecycle::inference::ServiceInfo;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct InfoResponse {
    #[serde(flatten)]
    pub info: ServiceInfo,
    pub uptime_seconds: u64,
}

/// GET / - Service name, version, operations and an example request
pub async fn service_info(State(state): State<SharedState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        info: state.service.describe(),
        uptime_seconds: state.uptime_seconds(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{empty_state, json_body};
    use axum::{http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn test_info_is_served_without_model() {
        let response = service_info(State(empty_state())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["service"], "Iris Classification Model");
        assert_eq!(body["endpoints"].as_array().unwrap().len(), 4);
        assert_eq!(
            body["example_request"],
            serde_json::json!({ "instances": [[5.1, 3.5, 1.4, 0.2]] })
        );
        assert!(body["uptime_seconds"].is_u64());
    }
}
