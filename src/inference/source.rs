//! Model acquisition
//!
//! The server acquires its classifier once at startup from a [`ModelSource`].
//! Both sources read a persisted [`ModelArtifact`]; they differ only in how
//! the artifact is addressed.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::model::{Classifier, ModelArtifact};
use crate::training::{RunRecord, RunStore};
use crate::utils::error::Result;

/// Where the loaded model came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub source: String,
    pub model_type: String,
    pub run_id: Option<String>,
    pub test_accuracy: Option<f64>,
}

impl ModelInfo {
    /// Info for a model built in-process rather than loaded from disk
    pub fn in_memory(model_type: &str) -> Self {
        Self {
            source: "memory".to_string(),
            model_type: model_type.to_string(),
            run_id: None,
            test_accuracy: None,
        }
    }
}

/// A read-only classifier handle plus its provenance
#[derive(Clone)]
pub struct LoadedModel {
    pub classifier: Arc<dyn Classifier>,
    pub info: ModelInfo,
}

impl LoadedModel {
    pub fn new(classifier: Arc<dyn Classifier>, info: ModelInfo) -> Self {
        Self { classifier, info }
    }

    fn from_artifact(artifact: ModelArtifact, source: String, record: Option<&RunRecord>) -> Self {
        let info = ModelInfo {
            source,
            model_type: artifact.model_type.clone(),
            run_id: record
                .map(|r| r.run_id.clone())
                .or_else(|| artifact.run_id.clone()),
            test_accuracy: record.and_then(|r| r.metric("test_accuracy")),
        };
        Self::new(Arc::new(artifact.model), info)
    }
}

impl fmt::Debug for LoadedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedModel")
            .field("kind", &self.classifier.kind())
            .field("info", &self.info)
            .finish()
    }
}

/// Something that can produce a classifier handle
pub trait ModelSource {
    fn load(&self) -> Result<LoadedModel>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}

/// Which run of an experiment to serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelector {
    /// Most recent finished run with a model
    Latest,
    RunId(String),
}

/// Load the model of a run in the local run store
#[derive(Debug, Clone)]
pub struct RunStoreSource {
    store: RunStore,
    experiment: String,
    selector: RunSelector,
}

impl RunStoreSource {
    pub fn new(store: RunStore, experiment: impl Into<String>, selector: RunSelector) -> Self {
        Self {
            store,
            experiment: experiment.into(),
            selector,
        }
    }

    pub fn latest(store: RunStore, experiment: impl Into<String>) -> Self {
        Self::new(store, experiment, RunSelector::Latest)
    }

    fn resolve_run(&self) -> Result<RunRecord> {
        match &self.selector {
            RunSelector::Latest => self.store.latest_run(&self.experiment),
            RunSelector::RunId(run_id) => self.store.load_run(&self.experiment, run_id),
        }
    }
}

impl ModelSource for RunStoreSource {
    fn load(&self) -> Result<LoadedModel> {
        let record = self.resolve_run()?;
        let path = self.store.model_path(&record)?;
        let artifact = ModelArtifact::load(&path)?;

        info!(
            "Serving run {} of experiment '{}' ({})",
            record.run_id, record.experiment, artifact.model_type
        );
        Ok(LoadedModel::from_artifact(artifact, self.describe(), Some(&record)))
    }

    fn describe(&self) -> String {
        let run = match &self.selector {
            RunSelector::Latest => "latest".to_string(),
            RunSelector::RunId(id) => id.clone(),
        };
        format!(
            "runs:{}/{}@{}",
            self.store.root().display(),
            self.experiment,
            run
        )
    }
}

/// Load a model artifact from an explicit path
#[derive(Debug, Clone)]
pub struct ArtifactFile {
    path: PathBuf,
}

impl ArtifactFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModelSource for ArtifactFile {
    fn load(&self) -> Result<LoadedModel> {
        let artifact = ModelArtifact::load(&self.path)?;
        Ok(LoadedModel::from_artifact(artifact, self.describe(), None))
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

/// Pick a source from command-line style options
///
/// An explicit artifact path wins over the run store.
pub fn select_source(
    runs_dir: &Path,
    experiment: &str,
    run_id: Option<String>,
    model_path: Option<PathBuf>,
) -> Box<dyn ModelSource> {
    if let Some(path) = model_path {
        return Box::new(ArtifactFile::new(path));
    }

    let selector = match run_id {
        Some(id) => RunSelector::RunId(id),
        None => RunSelector::Latest,
    };
    Box::new(RunStoreSource::new(
        RunStore::new(runs_dir),
        experiment,
        selector,
    ))
}
