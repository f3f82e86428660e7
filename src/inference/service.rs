//! Prediction service
//!
//! [`PredictionService`] is the explicitly constructed context every HTTP
//! handler receives. It owns the outcome of model acquisition as a typed
//! [`ModelState`]: either a loaded, read-only classifier or the reason it could
//! not be loaded. Nothing in it is mutated after construction, so it is shared
//! between concurrent requests without locking.
//!
//! Request validation happens in a fixed order, and callers rely on it to
//! know which error a request with several problems receives:
//!
//! 1. no model loaded -> [`ServiceError::ModelUnavailable`], input untouched
//! 2. malformed body or missing `instances` -> [`ServiceError::BadRequest`]
//! 3. an instance without exactly four numbers -> [`ServiceError::BadRequest`]
//! 4. model failure or an id outside the class table -> [`ServiceError::Internal`]

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use super::source::{LoadedModel, ModelInfo, ModelSource};
use crate::dataset::{class_name, FeatureVector, NUM_FEATURES};
use crate::utils::error::IrisError;

/// Name reported by the metadata endpoint
pub const SERVICE_NAME: &str = "Iris Classification Model";

/// Version reported by the metadata endpoint
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors surfaced at the request boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No model handle is available
    #[error("Model not loaded")]
    ModelUnavailable,

    /// The request does not match the schema
    #[error("{0}")]
    BadRequest(String),

    /// The model call or label mapping failed; details are only logged
    #[error("Internal error while computing predictions")]
    Internal,
}

impl ServiceError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::ModelUnavailable => 500,
            ServiceError::BadRequest(_) => 400,
            ServiceError::Internal => 500,
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }
}

/// Wire shape of a prediction request body
#[derive(Debug, Deserialize)]
struct PredictRequestBody {
    instances: Option<Vec<serde_json::Value>>,
}

/// A validated prediction request: at least one four-feature instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    instances: Vec<FeatureVector>,
}

impl PredictRequest {
    /// Build from already-typed instances
    pub fn new(instances: Vec<FeatureVector>) -> Result<Self, ServiceError> {
        if instances.is_empty() {
            return Err(ServiceError::bad_request(
                "'instances' must contain at least one feature vector",
            ));
        }
        Ok(Self { instances })
    }

    /// Decode and validate a JSON body
    pub fn from_json(body: &[u8]) -> Result<Self, ServiceError> {
        let parsed: PredictRequestBody = serde_json::from_slice(body)
            .map_err(|e| ServiceError::bad_request(format!("Invalid request body: {e}")))?;

        let raw = parsed
            .instances
            .ok_or_else(|| ServiceError::bad_request("Missing 'instances' in request"))?;

        let instances = raw
            .iter()
            .enumerate()
            .map(|(idx, value)| parse_instance(idx, value))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(instances)
    }

    pub fn instances(&self) -> &[FeatureVector] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// One instance: a list of exactly four numbers, length checked first
fn parse_instance(idx: usize, value: &serde_json::Value) -> Result<FeatureVector, ServiceError> {
    let arity_error = |detail: String| {
        ServiceError::bad_request(format!(
            "Expected {NUM_FEATURES} numeric features, {detail} (instance {idx})"
        ))
    };

    let values = value
        .as_array()
        .ok_or_else(|| arity_error("got a non-list value".to_string()))?;
    if values.len() != NUM_FEATURES {
        return Err(arity_error(format!("got {}", values.len())));
    }

    let mut features = [0.0; NUM_FEATURES];
    for (slot, (feature, element)) in features.iter_mut().zip(values).enumerate() {
        *feature = element
            .as_f64()
            .ok_or_else(|| arity_error(format!("element {slot} is not a number")))?;
    }
    Ok(features)
}

/// `{"predictions": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<usize>,
}

/// `{"predictions": [...], "prediction_names": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedPredictResponse {
    pub predictions: Vec<usize>,
    pub prediction_names: Vec<String>,
}

/// Health check result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthReport {
    Healthy {
        model_loaded: bool,
        #[serde(flatten)]
        model: ModelInfo,
    },
    Error {
        model_loaded: bool,
        message: String,
    },
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthReport::Healthy { .. })
    }
}

/// One entry of the metadata endpoint's operation list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// Operations exposed over HTTP
pub const ENDPOINTS: [EndpointInfo; 4] = [
    EndpointInfo {
        method: "GET",
        path: "/health",
        description: "Health check",
    },
    EndpointInfo {
        method: "POST",
        path: "/invocations",
        description: "Predict class ids",
    },
    EndpointInfo {
        method: "POST",
        path: "/predict_names",
        description: "Predict class ids and species names",
    },
    EndpointInfo {
        method: "GET",
        path: "/",
        description: "Service information",
    },
];

/// Example body shown by the metadata endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExampleRequest {
    pub instances: Vec<FeatureVector>,
}

/// Static service metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<EndpointInfo>,
    pub example_request: ExampleRequest,
}

/// Outcome of model acquisition, fixed for the lifetime of the service
pub enum ModelState {
    Loaded(LoadedModel),
    Unavailable { reason: String },
}

/// Shared request-handling context
pub struct PredictionService {
    state: ModelState,
}

impl PredictionService {
    /// Build from the result of a load attempt; a failure is kept, not retried
    pub fn new(model: crate::utils::error::Result<LoadedModel>) -> Self {
        match model {
            Ok(model) => Self::with_model(model),
            Err(e) => Self::unavailable(e),
        }
    }

    /// Acquire the model once from `source`
    pub fn from_source(source: &dyn ModelSource) -> Self {
        debug!("Loading model from {}", source.describe());
        Self::new(source.load())
    }

    pub fn with_model(model: LoadedModel) -> Self {
        Self {
            state: ModelState::Loaded(model),
        }
    }

    pub fn unavailable(reason: IrisError) -> Self {
        error!("Model could not be loaded, serving as unhealthy: {}", reason);
        Self {
            state: ModelState::Unavailable {
                reason: reason.to_string(),
            },
        }
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    /// Status and whether a model is loaded; never fails
    pub fn health(&self) -> HealthReport {
        match &self.state {
            ModelState::Loaded(model) => HealthReport::Healthy {
                model_loaded: true,
                model: model.info.clone(),
            },
            ModelState::Unavailable { .. } => HealthReport::Error {
                model_loaded: false,
                message: ServiceError::ModelUnavailable.to_string(),
            },
        }
    }

    /// Predict class ids for a raw JSON body
    pub fn predict(&self, body: &[u8]) -> Result<PredictResponse, ServiceError> {
        let model = self.model()?;
        let request = PredictRequest::from_json(body)?;
        let predictions = invoke(model, &request)?;
        Ok(PredictResponse { predictions })
    }

    /// Predict class ids and species names for a raw JSON body
    pub fn predict_with_names(&self, body: &[u8]) -> Result<NamedPredictResponse, ServiceError> {
        let model = self.model()?;
        let request = PredictRequest::from_json(body)?;
        let predictions = invoke(model, &request)?;
        let prediction_names = name_predictions(&predictions)?;
        Ok(NamedPredictResponse {
            predictions,
            prediction_names,
        })
    }

    /// Predict for an already validated request
    pub fn predict_request(&self, request: &PredictRequest) -> Result<PredictResponse, ServiceError> {
        let model = self.model()?;
        let predictions = invoke(model, request)?;
        Ok(PredictResponse { predictions })
    }

    /// Static metadata and an example request
    pub fn describe(&self) -> ServiceInfo {
        ServiceInfo {
            service: SERVICE_NAME,
            version: SERVICE_VERSION,
            endpoints: ENDPOINTS.to_vec(),
            example_request: ExampleRequest {
                instances: vec![[5.1, 3.5, 1.4, 0.2]],
            },
        }
    }

    fn model(&self) -> Result<&LoadedModel, ServiceError> {
        match &self.state {
            ModelState::Loaded(model) => Ok(model),
            ModelState::Unavailable { .. } => Err(ServiceError::ModelUnavailable),
        }
    }
}

fn invoke(model: &LoadedModel, request: &PredictRequest) -> Result<Vec<usize>, ServiceError> {
    let predictions = model
        .classifier
        .predict(request.instances())
        .map_err(|e| {
            error!("Model prediction failed: {}", e);
            ServiceError::Internal
        })?;

    if predictions.len() != request.len() {
        error!(
            "Model returned {} predictions for {} instances",
            predictions.len(),
            request.len()
        );
        return Err(ServiceError::Internal);
    }

    debug!("Predicted {} instances", predictions.len());
    Ok(predictions)
}

fn name_predictions(predictions: &[usize]) -> Result<Vec<String>, ServiceError> {
    predictions
        .iter()
        .map(|&id| {
            class_name(id).map(str::to_string).ok_or_else(|| {
                warn!("Model returned class id {} outside the label table", id);
                ServiceError::Internal
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::dataset::{IrisDataset, CLASS_NAMES};
    use crate::model::{Classifier, LogisticRegression, LogisticRegressionConfig};
    use crate::utils::error::Result;

    /// Returns a fixed id for every row and counts calls
    struct ConstantClassifier {
        id: usize,
        calls: AtomicUsize,
    }

    impl ConstantClassifier {
        fn new(id: usize) -> Self {
            Self {
                id,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Classifier for ConstantClassifier {
        fn predict(&self, features: &[FeatureVector]) -> Result<Vec<usize>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![self.id; features.len()])
        }

        fn kind(&self) -> &'static str {
            "constant"
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn predict(&self, _: &[FeatureVector]) -> Result<Vec<usize>> {
            Err(IrisError::Inference("secret internal detail".to_string()))
        }

        fn kind(&self) -> &'static str {
            "failing"
        }
    }

    struct ShortClassifier;

    impl Classifier for ShortClassifier {
        fn predict(&self, _: &[FeatureVector]) -> Result<Vec<usize>> {
            Ok(vec![0])
        }

        fn kind(&self) -> &'static str {
            "short"
        }
    }

    fn service_with(classifier: Arc<dyn Classifier>) -> PredictionService {
        PredictionService::with_model(LoadedModel::new(classifier, ModelInfo::in_memory("test")))
    }

    fn trained_service() -> PredictionService {
        let dataset = IrisDataset::builtin().unwrap();
        let model =
            LogisticRegression::fit(dataset.samples(), LogisticRegressionConfig::default()).unwrap();
        service_with(Arc::new(model))
    }

    fn unavailable_service() -> PredictionService {
        PredictionService::unavailable(IrisError::Tracking("no runs".to_string()))
    }

    #[test]
    fn test_single_setosa_instance() {
        let service = trained_service();
        let body = br#"{"instances": [[5.1, 3.5, 1.4, 0.2]]}"#;

        assert_eq!(service.predict(body).unwrap().predictions, vec![0]);

        let named = service.predict_with_names(body).unwrap();
        assert_eq!(named.predictions, vec![0]);
        assert_eq!(named.prediction_names, vec!["setosa"]);
    }

    #[test]
    fn test_order_is_preserved() {
        let service = trained_service();
        let body = br#"{"instances": [[7.0, 3.2, 4.7, 1.4], [6.3, 3.3, 6.0, 2.5]]}"#;

        let named = service.predict_with_names(body).unwrap();
        assert_eq!(named.predictions, vec![1, 2]);
        assert_eq!(named.prediction_names, vec!["versicolor", "virginica"]);

        let reversed = br#"{"instances": [[6.3, 3.3, 6.0, 2.5], [7.0, 3.2, 4.7, 1.4]]}"#;
        assert_eq!(service.predict(reversed).unwrap().predictions, vec![2, 1]);
    }

    #[test]
    fn test_every_builtin_sample_yields_one_valid_id() {
        let service = trained_service();
        let dataset = IrisDataset::builtin().unwrap();
        let body = serde_json::to_vec(&serde_json::json!({ "instances": dataset.features() })).unwrap();

        let named = service.predict_with_names(&body).unwrap();
        assert_eq!(named.predictions.len(), dataset.len());
        assert_eq!(named.prediction_names.len(), dataset.len());
        for (id, name) in named.predictions.iter().zip(&named.prediction_names) {
            assert!(*id < CLASS_NAMES.len());
            assert_eq!(name, CLASS_NAMES[*id]);
        }
    }

    #[test]
    fn test_predict_is_idempotent() {
        let service = trained_service();
        let body = br#"{"instances": [[5.9, 3.0, 5.1, 1.8], [5.7, 2.8, 4.1, 1.3]]}"#;
        assert_eq!(service.predict(body).unwrap(), service.predict(body).unwrap());
    }

    #[test]
    fn test_integer_features_are_accepted() {
        let service = service_with(Arc::new(ConstantClassifier::new(1)));
        let body = br#"{"instances": [[5, 3, 1, 0]]}"#;
        assert_eq!(service.predict(body).unwrap().predictions, vec![1]);
    }

    #[test]
    fn test_missing_instances_field() {
        let service = trained_service();
        let err = service.predict(br#"{"wrong_key": []}"#).unwrap_err();

        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("instances"));
    }

    #[test]
    fn test_wrong_arity_names_expected_count() {
        let service = trained_service();
        for body in [
            &br#"{"instances": [[5.1, 3.5, 1.4]]}"#[..],
            &br#"{"instances": [[5.1, 3.5, 1.4, 0.2, 9.9]]}"#[..],
        ] {
            let err = service.predict(body).unwrap_err();
            assert!(matches!(err, ServiceError::BadRequest(_)));
            assert!(err.to_string().contains("Expected 4 numeric features"), "{err}");
        }
    }

    #[test]
    fn test_arity_error_names_instance_index() {
        let service = trained_service();
        let err = service
            .predict(br#"{"instances": [[5.1, 3.5, 1.4, 0.2], [1.0, 2.0]]}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::BadRequest("Expected 4 numeric features, got 2 (instance 1)".to_string())
        );
    }

    #[test]
    fn test_arity_error_precedes_later_non_numeric_instance() {
        let service = trained_service();
        let err = service
            .predict_with_names(br#"{"instances": [[1, 2, 3], [1, "x", 3, 4]]}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::BadRequest("Expected 4 numeric features, got 3 (instance 0)".to_string())
        );
    }

    #[test]
    fn test_non_numeric_element_names_arity_and_instance() {
        let service = trained_service();
        let err = service
            .predict(br#"{"instances": [[5.1, 3.5, 1.4, 0.2], [1, "x", 3, 4]]}"#)
            .unwrap_err();
        assert_eq!(
            err,
            ServiceError::BadRequest(
                "Expected 4 numeric features, element 1 is not a number (instance 1)".to_string()
            )
        );

        let err = service.predict(br#"{"instances": [7]}"#).unwrap_err();
        assert!(err.to_string().contains("(instance 0)"), "{err}");
    }

    #[test]
    fn test_non_numeric_and_malformed_bodies() {
        let service = trained_service();
        for body in [
            &br#"{"instances": [[5.1, "wide", 1.4, 0.2]]}"#[..],
            &br#"{"instances": "5.1,3.5,1.4,0.2"}"#[..],
            &br#"{"instances": [[5.1, null, 1.4, 0.2]]}"#[..],
            &b"not json"[..],
            &b""[..],
        ] {
            let err = service.predict(body).unwrap_err();
            assert_eq!(err.status_code(), 400, "body {:?}", String::from_utf8_lossy(body));
        }
    }

    #[test]
    fn test_empty_instances_rejected() {
        let service = trained_service();
        let err = service.predict(br#"{"instances": []}"#).unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn test_unavailable_model_takes_precedence() {
        let service = unavailable_service();

        // Well-formed input
        let body = br#"{"instances": [[5.1, 3.5, 1.4, 0.2]]}"#;
        assert_eq!(service.predict(body).unwrap_err(), ServiceError::ModelUnavailable);
        assert_eq!(
            service.predict_with_names(body).unwrap_err(),
            ServiceError::ModelUnavailable
        );

        // Malformed input still reports the missing model first
        let err = service.predict(br#"{"wrong_key": []}"#).unwrap_err();
        assert_eq!(err, ServiceError::ModelUnavailable);
        assert_eq!(err.status_code(), 500);
        let err = service.predict_with_names(b"not json").unwrap_err();
        assert_eq!(err, ServiceError::ModelUnavailable);
    }

    #[test]
    fn test_shape_errors_precede_model_call() {
        let classifier = Arc::new(ConstantClassifier::new(0));
        let service = service_with(classifier.clone());

        assert!(service.predict(br#"{"instances": [[1.0, 2.0, 3.0]]}"#).is_err());
        assert!(service.predict(br#"{"wrong_key": []}"#).is_err());
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);

        service.predict(br#"{"instances": [[1.0, 2.0, 3.0, 4.0]]}"#).unwrap();
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shape_error_precedes_label_mapping_error() {
        // Id 7 is outside the table, but the arity error is reported first
        let service = service_with(Arc::new(ConstantClassifier::new(7)));
        let err = service
            .predict_with_names(br#"{"instances": [[1.0, 2.0, 3.0]]}"#)
            .unwrap_err();
        assert!(matches!(err, ServiceError::BadRequest(_)));
    }

    #[test]
    fn test_unknown_class_id_is_internal_for_names_only() {
        let service = service_with(Arc::new(ConstantClassifier::new(7)));
        let body = br#"{"instances": [[1.0, 2.0, 3.0, 4.0]]}"#;

        // Plain predictions pass model output through unchanged
        assert_eq!(service.predict(body).unwrap().predictions, vec![7]);
        assert_eq!(service.predict_with_names(body).unwrap_err(), ServiceError::Internal);
    }

    #[test]
    fn test_model_failure_is_generic_internal_error() {
        let service = service_with(Arc::new(FailingClassifier));
        let err = service
            .predict(br#"{"instances": [[1.0, 2.0, 3.0, 4.0]]}"#)
            .unwrap_err();

        assert_eq!(err, ServiceError::Internal);
        assert_eq!(err.status_code(), 500);
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_overflowing_features_are_internal_error() {
        let service = trained_service();
        let err = service
            .predict_with_names(br#"{"instances": [[1e308, 1e308, -1e308, 1e308]]}"#)
            .unwrap_err();
        assert_eq!(err, ServiceError::Internal);
    }

    #[test]
    fn test_length_mismatch_is_internal_error() {
        let service = service_with(Arc::new(ShortClassifier));
        let err = service
            .predict(br#"{"instances": [[1.0, 2.0, 3.0, 4.0], [1.0, 2.0, 3.0, 4.0]]}"#)
            .unwrap_err();
        assert_eq!(err, ServiceError::Internal);
    }

    #[test]
    fn test_health_reports_model_state() {
        let healthy = trained_service().health();
        assert!(healthy.is_healthy());
        let json = serde_json::to_value(&healthy).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["model_loaded"], true);

        let degraded = unavailable_service().health();
        assert!(!degraded.is_healthy());
        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["model_loaded"], false);
        // The load failure reason is logged, not exposed
        assert_eq!(json["message"], "Model not loaded");
    }

    #[test]
    fn test_from_failing_source_is_unhealthy() {
        struct BrokenSource;

        impl ModelSource for BrokenSource {
            fn load(&self) -> Result<LoadedModel> {
                Err(IrisError::Model("corrupt artifact".to_string()))
            }

            fn describe(&self) -> String {
                "broken".to_string()
            }
        }

        let service = PredictionService::from_source(&BrokenSource);
        assert!(!service.is_ready());
        assert!(matches!(service.state(), ModelState::Unavailable { .. }));
        assert!(!service.health().is_healthy());
    }

    #[test]
    fn test_describe_lists_operations_and_example() {
        let info = unavailable_service().describe();
        assert_eq!(info.service, SERVICE_NAME);
        assert_eq!(info.version, SERVICE_VERSION);

        let paths: Vec<&str> = info.endpoints.iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["/health", "/invocations", "/predict_names", "/"]);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["example_request"]["instances"], serde_json::json!([[5.1, 3.5, 1.4, 0.2]]));
    }

    #[test]
    fn test_example_request_is_accepted() {
        let service = trained_service();
        let example = serde_json::to_vec(&service.describe().example_request).unwrap();
        assert_eq!(service.predict(&example).unwrap().predictions, vec![0]);
    }

    #[test]
    fn test_typed_request_entry_point() {
        let service = service_with(Arc::new(ConstantClassifier::new(2)));
        let request = PredictRequest::new(vec![[1.0; 4], [2.0; 4]]).unwrap();
        assert_eq!(service.predict_request(&request).unwrap().predictions, vec![2, 2]);
        assert!(PredictRequest::new(Vec::new()).is_err());
    }
}
