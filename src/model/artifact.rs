//! Persisted model format
//!
//! A fitted model is written as pretty JSON together with the feature and
//! class tables it was trained against. Loading refuses artifacts whose tables
//! or parameter shapes disagree with this build.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Classifier, LogisticRegression};
use crate::dataset::{CLASS_NAMES, FEATURE_NAMES};
use crate::utils::error::{IrisError, Result};

/// Bumped whenever the on-disk layout changes incompatibly
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_type: String,
    pub created_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub class_names: Vec<String>,
    /// Run that produced this artifact, if it came from the run store
    pub run_id: Option<String>,
    pub model: LogisticRegression,
}

impl ModelArtifact {
    pub fn new(model: LogisticRegression, run_id: Option<String>) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_type: model.kind().to_string(),
            created_at: Utc::now(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            class_names: CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            run_id,
            model,
        }
    }

    /// Save artifact to file, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| IrisError::Serialization(format!("Failed to serialize model: {}", e)))?;
        fs::write(path, json)?;

        info!("Model artifact saved to {:?}", path);
        Ok(())
    }

    /// Load and validate an artifact
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IrisError::PathNotFound(path.to_path_buf()));
        }

        let json = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&json).map_err(|e| {
            IrisError::Serialization(format!("Failed to deserialize model {:?}: {}", path, e))
        })?;
        artifact.validate()?;

        info!("Model artifact loaded from {:?}", path);
        Ok(artifact)
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(IrisError::Model(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, ARTIFACT_FORMAT_VERSION
            )));
        }
        if self.feature_names != FEATURE_NAMES {
            return Err(IrisError::Model(format!(
                "artifact feature names {:?} do not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.class_names != CLASS_NAMES {
            return Err(IrisError::Model(format!(
                "artifact class names {:?} do not match {:?}",
                self.class_names, CLASS_NAMES
            )));
        }
        self.model.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::IrisDataset;
    use crate::model::LogisticRegressionConfig;
    use tempfile::tempdir;

    fn small_model() -> LogisticRegression {
        let dataset = IrisDataset::builtin().unwrap();
        let config = LogisticRegressionConfig {
            max_iter: 50,
            ..LogisticRegressionConfig::default()
        };
        LogisticRegression::fit(dataset.samples(), config).unwrap()
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run/model.json");

        let model = small_model();
        ModelArtifact::new(model.clone(), Some("abc".to_string()))
            .save(&path)
            .unwrap();

        let loaded = ModelArtifact::load(&path).unwrap();
        assert_eq!(loaded.run_id.as_deref(), Some("abc"));
        assert_eq!(loaded.model_type, "logistic_regression");

        let probe = [[5.1, 3.5, 1.4, 0.2], [6.3, 3.3, 6.0, 2.5]];
        assert_eq!(loaded.model.predict(&probe).unwrap(), model.predict(&probe).unwrap());
    }

    #[test]
    fn test_rejects_mismatched_class_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");

        let mut artifact = ModelArtifact::new(small_model(), None);
        artifact.class_names = vec!["a".into(), "b".into(), "c".into()];
        artifact.save(&path).unwrap();

        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(matches!(err, IrisError::Model(_)));
    }

    #[test]
    fn test_rejects_corrupt_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{\"format_version\": 1").unwrap();

        let err = ModelArtifact::load(&path).unwrap_err();
        assert!(matches!(err, IrisError::Serialization(_)));
    }

    #[test]
    fn test_missing_artifact() {
        let err = ModelArtifact::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, IrisError::PathNotFound(_)));
    }
}
