//! Dataset loading and CSV export
//!
//! The dataset ships with the crate (`data/iris.csv`), so training and tests
//! never depend on a download step. External CSV files must use the same
//! column layout:
//!
//! ```text
//! sepal length (cm),sepal width (cm),petal length (cm),petal width (cm),target,target_name
//! ```
//!
//! `target_name` is optional on input; when present it must agree with `target`.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{class_name, FeatureVector, NUM_CLASSES};
use crate::utils::error::{IrisError, Result};

const BUILTIN_CSV: &str = include_str!("../../data/iris.csv");

/// A labeled flower
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrisSample {
    /// Measurements in `FEATURE_NAMES` order
    pub features: FeatureVector,
    /// Class id in `0..NUM_CLASSES`
    pub label: usize,
}

/// On-disk row layout. Every field is optional so a missing value is
/// reported with its line number instead of a generic decode error.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(rename = "sepal length (cm)")]
    sepal_length: Option<f64>,
    #[serde(rename = "sepal width (cm)")]
    sepal_width: Option<f64>,
    #[serde(rename = "petal length (cm)")]
    petal_length: Option<f64>,
    #[serde(rename = "petal width (cm)")]
    petal_width: Option<f64>,
    target: Option<usize>,
    target_name: Option<String>,
}

impl CsvRow {
    fn into_sample(self, line: u64) -> Result<IrisSample> {
        let missing = |column: &str| {
            IrisError::Dataset(format!("line {line}: missing value for '{column}'"))
        };

        let features = [
            self.sepal_length.ok_or_else(|| missing("sepal length (cm)"))?,
            self.sepal_width.ok_or_else(|| missing("sepal width (cm)"))?,
            self.petal_length.ok_or_else(|| missing("petal length (cm)"))?,
            self.petal_width.ok_or_else(|| missing("petal width (cm)"))?,
        ];

        if let Some(idx) = features.iter().position(|v| !v.is_finite()) {
            return Err(IrisError::Dataset(format!(
                "line {line}: non-finite value in feature column {idx}"
            )));
        }

        let label = self.target.ok_or_else(|| missing("target"))?;
        let expected_name = class_name(label).ok_or_else(|| {
            IrisError::Dataset(format!(
                "line {line}: target {label} outside 0..{NUM_CLASSES}"
            ))
        })?;

        if let Some(name) = self.target_name.as_deref() {
            if name != expected_name {
                return Err(IrisError::Dataset(format!(
                    "line {line}: target_name '{name}' does not match target {label} ('{expected_name}')"
                )));
            }
        }

        Ok(IrisSample { features, label })
    }

    fn from_sample(sample: &IrisSample) -> Self {
        Self {
            sepal_length: Some(sample.features[0]),
            sepal_width: Some(sample.features[1]),
            petal_length: Some(sample.features[2]),
            petal_width: Some(sample.features[3]),
            target: Some(sample.label),
            target_name: class_name(sample.label).map(str::to_string),
        }
    }
}

/// In-memory labeled dataset
#[derive(Debug, Clone, Default)]
pub struct IrisDataset {
    samples: Vec<IrisSample>,
}

impl IrisDataset {
    /// Wrap already-validated samples
    pub fn new(samples: Vec<IrisSample>) -> Self {
        Self { samples }
    }

    /// The bundled 150-sample dataset
    pub fn builtin() -> Result<Self> {
        Self::from_reader(BUILTIN_CSV.as_bytes())
    }

    /// Load a CSV file
    pub fn from_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(IrisError::PathNotFound(path.to_path_buf()));
        }

        let file = fs::File::open(path)?;
        let dataset = Self::from_reader(file)?;
        info!("Loaded {} samples from {:?}", dataset.len(), path);
        Ok(dataset)
    }

    /// Parse CSV content with a header row
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut samples = Vec::new();
        for (idx, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
            // Header is line 1
            let line = idx as u64 + 2;
            let row = row.map_err(|e| IrisError::Dataset(format!("line {line}: {e}")))?;
            samples.push(row.into_sample(line)?);
        }

        if samples.is_empty() {
            return Err(IrisError::Dataset("dataset contains no rows".to_string()));
        }

        debug!("Parsed {} samples", samples.len());
        Ok(Self { samples })
    }

    /// Write the dataset as CSV, creating parent directories as needed
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        for sample in &self.samples {
            writer.serialize(CsvRow::from_sample(sample))?;
        }
        writer.flush()?;

        info!("Dataset written to {:?}", path);
        Ok(())
    }

    pub fn samples(&self) -> &[IrisSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Feature vectors in sample order
    pub fn features(&self) -> Vec<FeatureVector> {
        self.samples.iter().map(|s| s.features).collect()
    }

    /// Labels in sample order
    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// Number of samples per class id
    pub fn class_counts(&self) -> [usize; NUM_CLASSES] {
        let mut counts = [0; NUM_CLASSES];
        for sample in &self.samples {
            if let Some(count) = counts.get_mut(sample.label) {
                *count += 1;
            }
        }
        counts
    }
}
