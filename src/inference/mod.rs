//! Inference module
//!
//! This module provides:
//! - The prediction service context shared by HTTP handlers
//! - Model acquisition from the run store or an artifact file
//! - A smoke test client for a running server

pub mod probe;
pub mod service;
pub mod source;

pub use probe::{probe_server, ProbeOutcome, ProbeReport, CANONICAL_SAMPLES};
pub use service::{
    HealthReport, NamedPredictResponse, PredictRequest, PredictResponse, PredictionService,
    ServiceError, ServiceInfo,
};
pub use source::{
    select_source, ArtifactFile, LoadedModel, ModelInfo, ModelSource, RunSelector, RunStoreSource,
};

/// Default port of the prediction server
pub const DEFAULT_PORT: u16 = 1235;
