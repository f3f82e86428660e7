//! # Iris Lifecycle
//!
//! A Rust library covering the full lifecycle of a small flower species
//! classifier: exploring the bundled iris measurements, training a
//! multinomial logistic regression, tracking runs on the local filesystem,
//! and serving predictions over HTTP.
//!
//! ## Modules
//!
//! - `dataset`: Bundled data, CSV loading, stratified splits and descriptive statistics
//! - `model`: The `Classifier` contract, logistic regression and the persisted artifact format
//! - `training`: Training runs and the local run store
//! - `inference`: Prediction service context, model sources and a smoke test client
//! - `utils`: Logging, metrics, and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use iris_lifecycle::dataset::IrisDataset;
//! use iris_lifecycle::training::{run_training, RunStore, TrainingConfig};
//! use iris_lifecycle::inference::{PredictionService, RunStoreSource};
//!
//! let dataset = IrisDataset::builtin()?;
//! let store = RunStore::new("mlruns");
//! let report = run_training(&dataset, &TrainingConfig::default(), &store)?;
//!
//! let source = RunStoreSource::latest(store, report.experiment);
//! let service = PredictionService::from_source(&source);
//! let response = service.predict(br#"{"instances": [[5.1, 3.5, 1.4, 0.2]]}"#)?;
//! ```

pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use dataset::{FeatureVector, IrisDataset, IrisSample, CLASS_NAMES, FEATURE_NAMES};
pub use inference::{PredictionService, ServiceError};
pub use model::{Classifier, LogisticRegression, LogisticRegressionConfig, ModelArtifact};
pub use training::{run_training, RunStore, TrainingConfig};
pub use utils::error::{IrisError, Result};
pub use utils::metrics::{ConfusionMatrix, Metrics};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
