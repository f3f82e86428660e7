//! Descriptive exploration of a dataset: shape, per-feature statistics and
//! class balance. Nothing here touches a model.

use serde::Serialize;

use super::{IrisDataset, CLASS_NAMES, FEATURE_NAMES, NUM_FEATURES};

/// Summary statistics for one feature column
#[derive(Debug, Clone, Serialize)]
pub struct FeatureStats {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl FeatureStats {
    fn from_values(name: &str, values: &[f64]) -> Self {
        let count = values.len();
        let mut sorted: Vec<f64> = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mean = if count > 0 {
            values.iter().sum::<f64>() / count as f64
        } else {
            f64::NAN
        };

        let std = if count > 1 {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Self {
            name: name.to_string(),
            count,
            mean,
            std,
            min: sorted.first().copied().unwrap_or(f64::NAN),
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }
}

/// Linear-interpolated quantile of already sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Number of samples for one class
#[derive(Debug, Clone, Serialize)]
pub struct ClassCount {
    pub name: String,
    pub count: usize,
}

/// Full exploration report
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub num_rows: usize,
    pub columns: Vec<String>,
    pub features: Vec<FeatureStats>,
    pub class_distribution: Vec<ClassCount>,
    pub non_finite_values: usize,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &IrisDataset) -> Self {
        let mut columns: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        columns.push("target".to_string());
        columns.push("target_name".to_string());

        let features = (0..NUM_FEATURES)
            .map(|idx| {
                let values: Vec<f64> = dataset.samples().iter().map(|s| s.features[idx]).collect();
                FeatureStats::from_values(FEATURE_NAMES[idx], &values)
            })
            .collect();

        let counts = dataset.class_counts();
        let class_distribution = CLASS_NAMES
            .iter()
            .zip(counts.iter())
            .map(|(name, &count)| ClassCount {
                name: name.to_string(),
                count,
            })
            .collect();

        let non_finite_values = dataset
            .samples()
            .iter()
            .flat_map(|s| s.features.iter())
            .filter(|v| !v.is_finite())
            .count();

        Self {
            num_rows: dataset.len(),
            columns,
            features,
            class_distribution,
            non_finite_values,
        }
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows, self.columns.len())
    }

    /// True when every class has the same number of samples
    pub fn is_balanced(&self) -> bool {
        let mut counts = self.class_distribution.iter().map(|c| c.count);
        match counts.next() {
            Some(first) => counts.all(|c| c == first),
            None => true,
        }
    }

    /// Describe-style table, one row per statistic
    pub fn describe_table(&self) -> String {
        let mut output = format!("{:>8}", "");
        for feature in &self.features {
            output.push_str(&format!(" {:>18}", feature.name));
        }
        output.push('\n');

        let rows: [(&str, fn(&FeatureStats) -> f64); 8] = [
            ("count", |f| f.count as f64),
            ("mean", |f| f.mean),
            ("std", |f| f.std),
            ("min", |f| f.min),
            ("25%", |f| f.q25),
            ("50%", |f| f.median),
            ("75%", |f| f.q75),
            ("max", |f| f.max),
        ];

        for (label, value) in rows {
            output.push_str(&format!("{label:>8}"));
            for feature in &self.features {
                output.push_str(&format!(" {:>18.6}", value(feature)));
            }
            output.push('\n');
        }

        output
    }
}
