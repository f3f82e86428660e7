//! Local run store
//!
//! Each training run gets its own directory:
//!
//! ```text
//! <root>/<experiment>/<run_id>/run.json     params, metrics, status
//! <root>/<experiment>/<run_id>/model.json   fitted model artifact
//! ```
//!
//! The server resolves its model through this layout, either by run id or by
//! picking the most recent finished run of an experiment.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::utils::error::{IrisError, Result};

/// Run metadata file name inside a run directory
pub const RUN_FILE: &str = "run.json";

/// Model artifact file name inside a run directory
pub const MODEL_FILE: &str = "model.json";

/// Status of a training run
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// Metadata recorded for a single run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub experiment: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub params: BTreeMap<String, serde_json::Value>,
    pub metrics: BTreeMap<String, f64>,
    /// Artifact file name relative to the run directory
    pub artifact: Option<String>,
    pub registered_model_name: Option<String>,
}

impl RunRecord {
    pub fn log_param(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.params.insert(key.to_string(), value.into());
    }

    pub fn log_metric(&mut self, key: &str, value: f64) {
        self.metrics.insert(key.to_string(), value);
    }

    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied()
    }

    /// Finished and carrying a model artifact
    pub fn is_servable(&self) -> bool {
        self.status == RunStatus::Finished && self.artifact.is_some()
    }
}

/// Filesystem-backed store of runs
#[derive(Clone, Debug)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn experiment_dir(&self, experiment: &str) -> Result<PathBuf> {
        validate_component("experiment", experiment)?;
        Ok(self.root.join(experiment))
    }

    pub fn run_dir(&self, experiment: &str, run_id: &str) -> Result<PathBuf> {
        validate_component("run id", run_id)?;
        Ok(self.experiment_dir(experiment)?.join(run_id))
    }

    /// Create a new run directory and record it as running
    pub fn start_run(&self, experiment: &str) -> Result<RunRecord> {
        let run_id = Uuid::new_v4().simple().to_string();
        let record = RunRecord {
            run_id,
            experiment: experiment.to_string(),
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifact: None,
            registered_model_name: None,
        };

        fs::create_dir_all(self.run_dir(experiment, &record.run_id)?)?;
        self.save_run(&record)?;

        info!("Started run {} in experiment '{}'", record.run_id, experiment);
        Ok(record)
    }

    /// Mark a run finished (or failed) and persist it
    pub fn end_run(&self, record: &mut RunRecord, status: RunStatus) -> Result<()> {
        record.status = status;
        record.finished_at = Some(Utc::now());
        self.save_run(record)
    }

    pub fn save_run(&self, record: &RunRecord) -> Result<()> {
        let path = self.run_dir(&record.experiment, &record.run_id)?.join(RUN_FILE);
        let json = serde_json::to_string_pretty(record)?;
        fs::write(&path, json)?;
        debug!("Run metadata written to {:?}", path);
        Ok(())
    }

    pub fn load_run(&self, experiment: &str, run_id: &str) -> Result<RunRecord> {
        let path = self.run_dir(experiment, run_id)?.join(RUN_FILE);
        if !path.exists() {
            return Err(IrisError::Tracking(format!(
                "run '{}' not found in experiment '{}'",
                run_id, experiment
            )));
        }

        let json = fs::read_to_string(&path)?;
        let record: RunRecord = serde_json::from_str(&json)?;
        Ok(record)
    }

    /// All readable runs of an experiment, newest first
    pub fn list_runs(&self, experiment: &str) -> Result<Vec<RunRecord>> {
        let dir = self.experiment_dir(experiment)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let run_file = path.join(RUN_FILE);
            let parsed = fs::read_to_string(&run_file)
                .map_err(IrisError::from)
                .and_then(|json| serde_json::from_str::<RunRecord>(&json).map_err(IrisError::from));

            match parsed {
                Ok(record) => runs.push(record),
                Err(e) => warn!("Skipping unreadable run at {:?}: {}", path, e),
            }
        }

        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    /// Most recent finished run that has a model artifact
    pub fn latest_run(&self, experiment: &str) -> Result<RunRecord> {
        self.list_runs(experiment)?
            .into_iter()
            .find(RunRecord::is_servable)
            .ok_or_else(|| {
                IrisError::Tracking(format!(
                    "no finished runs with a model in experiment '{}' under {:?}",
                    experiment, self.root
                ))
            })
    }

    /// Absolute path of a run's model artifact
    pub fn model_path(&self, record: &RunRecord) -> Result<PathBuf> {
        let artifact = record.artifact.as_deref().ok_or_else(|| {
            IrisError::Tracking(format!("run '{}' has no model artifact", record.run_id))
        })?;
        Ok(self.run_dir(&record.experiment, &record.run_id)?.join(artifact))
    }
}

/// Reject names that would escape the store directory
fn validate_component(what: &str, value: &str) -> Result<()> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\');
    if invalid {
        return Err(IrisError::Tracking(format!("invalid {what}: '{value}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_start_and_reload_run() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path());

        let mut run = store.start_run("exp").unwrap();
        run.log_param("C", 1.0);
        run.log_param("max_iter", 1000usize);
        run.log_metric("test_accuracy", 0.97);
        store.end_run(&mut run, RunStatus::Finished).unwrap();

        let loaded = store.load_run("exp", &run.run_id).unwrap();
        assert_eq!(loaded.status, RunStatus::Finished);
        assert_eq!(loaded.metric("test_accuracy"), Some(0.97));
        assert_eq!(loaded.params["max_iter"], serde_json::json!(1000));
        assert!(loaded.finished_at.is_some());
    }

    #[test]
    fn test_latest_run_skips_unservable() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path());

        let mut servable = store.start_run("exp").unwrap();
        servable.artifact = Some(MODEL_FILE.to_string());
        store.end_run(&mut servable, RunStatus::Finished).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let mut failed = store.start_run("exp").unwrap();
        store.end_run(&mut failed, RunStatus::Failed).unwrap();

        let runs = store.list_runs("exp").unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].run_id, failed.run_id);

        let latest = store.latest_run("exp").unwrap();
        assert_eq!(latest.run_id, servable.run_id);
        assert!(store.model_path(&latest).unwrap().ends_with(MODEL_FILE));
    }

    #[test]
    fn test_empty_experiment() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path());

        assert!(store.list_runs("missing").unwrap().is_empty());
        assert!(matches!(store.latest_run("missing"), Err(IrisError::Tracking(_))));
        assert!(store.load_run("missing", "abc").is_err());
    }

    #[test]
    fn test_list_skips_corrupt_runs() {
        let dir = tempdir().unwrap();
        let store = RunStore::new(dir.path());
        store.start_run("exp").unwrap();

        let broken = dir.path().join("exp/broken");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(RUN_FILE), "not json").unwrap();

        assert_eq!(store.list_runs("exp").unwrap().len(), 1);
    }

    #[test]
    fn test_rejects_path_traversal() {
        let store = RunStore::new("/tmp/runs");
        assert!(store.run_dir("exp", "../other").is_err());
        assert!(store.experiment_dir("..").is_err());
        assert!(store.experiment_dir("").is_err());
    }
}
