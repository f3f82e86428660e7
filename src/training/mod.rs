//! Training module
//!
//! A training run is a single linear sequence: split, fit, score both
//! halves, record params and metrics in the run store, and persist the
//! fitted model next to them.

pub mod tracking;

pub use tracking::{RunRecord, RunStatus, RunStore, MODEL_FILE, RUN_FILE};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::dataset::{
    train_test_split, IrisDataset, IrisSample, SplitConfig, CLASS_NAMES, NUM_CLASSES,
    NUM_FEATURES,
};
use crate::model::{Classifier, LogisticRegression, LogisticRegressionConfig, ModelArtifact};
use crate::utils::error::{IrisError, Result};
use crate::utils::metrics::Metrics;

/// Default experiment name for training runs
pub const DEFAULT_EXPERIMENT: &str = "iris-classification";

/// Default registered model name recorded on each run
pub const DEFAULT_REGISTERED_MODEL: &str = "iris_logistic_regression";

/// Main configuration for a training run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainingConfig {
    /// Experiment the run is grouped under
    pub experiment: String,
    /// Name recorded on the run for the produced model
    pub registered_model_name: String,
    /// Train/test split
    pub split: SplitConfig,
    /// Solver hyperparameters
    pub model: LogisticRegressionConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            experiment: DEFAULT_EXPERIMENT.to_string(),
            registered_model_name: DEFAULT_REGISTERED_MODEL.to_string(),
            split: SplitConfig::default(),
            model: LogisticRegressionConfig::default(),
        }
    }
}

impl TrainingConfig {
    /// Load from a TOML file; missing keys take their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            IrisError::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.experiment.trim().is_empty() {
            return Err(IrisError::Config("experiment name must not be empty".to_string()));
        }
        self.split.validate()?;
        self.model.validate()
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub run_id: String,
    pub experiment: String,
    pub train_metrics: Metrics,
    pub test_metrics: Metrics,
    /// train accuracy minus test accuracy
    pub overfitting: f64,
    pub n_iter: usize,
    pub artifact_path: PathBuf,
}

/// Train on `dataset` and record the run in `store`
///
/// A run that fails after it has started is persisted with status `failed`.
pub fn run_training(
    dataset: &IrisDataset,
    config: &TrainingConfig,
    store: &RunStore,
) -> Result<TrainingReport> {
    config.validate()?;

    let mut run = store.start_run(&config.experiment)?;

    match train_in_run(dataset, config, store, &mut run) {
        Ok(report) => {
            store.end_run(&mut run, RunStatus::Finished)?;
            info!(
                "Run {} finished: test accuracy {:.4}",
                run.run_id, report.test_metrics.accuracy
            );
            Ok(report)
        }
        Err(e) => {
            error!("Run {} failed: {}", run.run_id, e);
            if let Err(save_err) = store.end_run(&mut run, RunStatus::Failed) {
                error!("Could not record failure of run {}: {}", run.run_id, save_err);
            }
            Err(e)
        }
    }
}

fn train_in_run(
    dataset: &IrisDataset,
    config: &TrainingConfig,
    store: &RunStore,
    run: &mut RunRecord,
) -> Result<TrainingReport> {
    let split = train_test_split(dataset.samples(), &config.split)?;
    info!(
        "Split {} samples: train {}, test {}",
        dataset.len(),
        split.train.len(),
        split.test.len()
    );

    run.log_param("C", config.model.c);
    run.log_param("max_iter", config.model.max_iter);
    run.log_param("learning_rate", config.model.learning_rate);
    run.log_param("tolerance", config.model.tolerance);
    run.log_param("seed", config.split.seed);
    run.log_param("test_fraction", config.split.test_fraction);
    run.log_param("stratified", config.split.stratified);
    run.log_param("train_samples", split.train.len());
    run.log_param("test_samples", split.test.len());
    run.log_param("features", NUM_FEATURES);
    run.log_param("classes", distinct_labels(dataset.samples()));
    store.save_run(run)?;

    info!("Fitting logistic regression");
    let model = LogisticRegression::fit(&split.train, config.model.clone())?;

    let train_metrics = evaluate(&model, &split.train)?;
    let test_metrics = evaluate(&model, &split.test)?;
    let overfitting = train_metrics.accuracy - test_metrics.accuracy;

    for (prefix, metrics) in [("train", &train_metrics), ("test", &test_metrics)] {
        run.log_metric(&format!("{prefix}_accuracy"), metrics.accuracy);
        run.log_metric(&format!("{prefix}_precision"), metrics.weighted_precision);
        run.log_metric(&format!("{prefix}_recall"), metrics.weighted_recall);
        run.log_metric(&format!("{prefix}_f1"), metrics.weighted_f1);
    }
    run.log_metric("overfitting", overfitting);
    run.log_param("n_iter", model.n_iter());

    let n_iter = model.n_iter();
    let artifact_path = store.run_dir(&run.experiment, &run.run_id)?.join(MODEL_FILE);
    ModelArtifact::new(model, Some(run.run_id.clone())).save(&artifact_path)?;
    run.artifact = Some(MODEL_FILE.to_string());
    run.registered_model_name = Some(config.registered_model_name.clone());

    Ok(TrainingReport {
        run_id: run.run_id.clone(),
        experiment: run.experiment.clone(),
        train_metrics,
        test_metrics,
        overfitting,
        n_iter,
        artifact_path,
    })
}

/// Score a model on labeled samples
pub fn evaluate(model: &dyn Classifier, samples: &[IrisSample]) -> Result<Metrics> {
    let features: Vec<_> = samples.iter().map(|s| s.features).collect();
    let labels: Vec<usize> = samples.iter().map(|s| s.label).collect();
    let predictions = model.predict(&features)?;

    if predictions.len() != labels.len() {
        return Err(IrisError::Model(format!(
            "model returned {} predictions for {} samples",
            predictions.len(),
            labels.len()
        )));
    }

    Ok(Metrics::from_predictions(&predictions, &labels, NUM_CLASSES).with_class_names(&CLASS_NAMES))
}

fn distinct_labels(samples: &[IrisSample]) -> usize {
    let mut seen = [false; NUM_CLASSES];
    for sample in samples {
        if let Some(flag) = seen.get_mut(sample.label) {
            *flag = true;
        }
    }
    seen.iter().filter(|&&s| s).count()
}
