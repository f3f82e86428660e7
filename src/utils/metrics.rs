//! Metrics Module for Model Evaluation
//!
//! Classification metrics logged with every training run:
//! - Accuracy
//! - Precision, Recall, F1-score (per class, macro and support-weighted)
//! - Confusion Matrix

use serde::{Deserialize, Serialize};

/// Evaluation metrics for one split of a training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall accuracy (correct / total)
    pub accuracy: f64,

    /// Support-weighted precision
    pub weighted_precision: f64,

    /// Support-weighted recall
    pub weighted_recall: f64,

    /// Support-weighted F1-score
    pub weighted_f1: f64,

    /// Macro-averaged F1-score over classes with support
    pub macro_f1: f64,

    /// Per-class metrics
    pub per_class: Vec<ClassMetrics>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create new metrics from predictions and ground truth labels
    ///
    /// Slices of different length are compared up to the shorter one.
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let total_samples = predictions.len().min(ground_truth.len());
        if total_samples == 0 {
            return Self::default();
        }

        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        let correct_predictions = predictions
            .iter()
            .zip(ground_truth.iter())
            .filter(|(p, g)| p == g)
            .count();

        let accuracy = correct_predictions as f64 / total_samples as f64;

        let per_class: Vec<ClassMetrics> = (0..num_classes)
            .map(|class_idx| ClassMetrics::from_confusion_matrix(&confusion_matrix, class_idx))
            .collect();

        let total_support: usize = per_class.iter().map(|m| m.support).sum();
        let weighted = |value: fn(&ClassMetrics) -> f64| {
            if total_support == 0 {
                return 0.0;
            }
            per_class
                .iter()
                .map(|m| value(m) * m.support as f64)
                .sum::<f64>()
                / total_support as f64
        };

        let weighted_precision = weighted(|m| m.precision);
        let weighted_recall = weighted(|m| m.recall);
        let weighted_f1 = weighted(|m| m.f1);

        let supported: Vec<&ClassMetrics> = per_class.iter().filter(|m| m.support > 0).collect();
        let macro_f1 = if supported.is_empty() {
            0.0
        } else {
            supported.iter().map(|m| m.f1).sum::<f64>() / supported.len() as f64
        };

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            weighted_precision,
            weighted_recall,
            weighted_f1,
            macro_f1,
            per_class,
            confusion_matrix,
        }
    }

    /// Attach class names to the per-class entries
    pub fn with_class_names(mut self, names: &[&str]) -> Self {
        for class in &mut self.per_class {
            if let Some(name) = names.get(class.class_idx) {
                class.class_name = Some((*name).to_string());
            }
        }
        self
    }

    /// Pretty print metrics
    pub fn display(&self) -> String {
        let mut output = String::new();

        output.push_str("╔══════════════════════════════════════════════╗\n");
        output.push_str("║              Evaluation Metrics              ║\n");
        output.push_str("╠══════════════════════════════════════════════╣\n");
        output.push_str(&format!("║ Accuracy:            {:6.2}%                 ║\n", self.accuracy * 100.0));
        output.push_str(&format!("║ Weighted Precision:  {:6.2}%                 ║\n", self.weighted_precision * 100.0));
        output.push_str(&format!("║ Weighted Recall:     {:6.2}%                 ║\n", self.weighted_recall * 100.0));
        output.push_str(&format!("║ Weighted F1:         {:6.2}%                 ║\n", self.weighted_f1 * 100.0));
        output.push_str(&format!("║ Total Samples:       {:6}                  ║\n", self.total_samples));
        output.push_str("╚══════════════════════════════════════════════╝\n");

        output
    }
}

impl std::fmt::Display for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Per-class metrics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    /// Class name (if available)
    pub class_name: Option<String>,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Support = number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for a class from confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        // Predicted as this class but actually another
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // Actually this class but predicted as another
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;

        let precision = if true_positives + false_positives > 0 {
            true_positives as f64 / (true_positives + false_positives) as f64
        } else {
            0.0
        };

        let recall = if support > 0 {
            true_positives as f64 / support as f64
        } else {
            0.0
        };

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            class_name: None,
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Matrix data (row = actual, column = predicted), row-major
    pub matrix: Vec<usize>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Create confusion matrix from predictions and ground truth
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut cm = Self::new(num_classes);

        for (&pred, &actual) in predictions.iter().zip(ground_truth.iter()) {
            cm.add(actual, pred);
        }

        cm
    }

    /// Add a single prediction to the matrix; out-of-range labels are ignored
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            let idx = actual * self.num_classes + predicted;
            self.matrix[idx] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    /// Get the total count
    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Get the number of correct predictions (diagonal sum)
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    /// Get overall accuracy
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.correct() as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Render as a text table, rows = actual, columns = predicted
    pub fn display(&self, class_names: Option<&[&str]>) -> String {
        let label = |idx: usize| -> String {
            class_names
                .and_then(|names| names.get(idx))
                .map(|name| (*name).to_string())
                .unwrap_or_else(|| idx.to_string())
        };

        let mut output = format!("{:>12}", "");
        for col in 0..self.num_classes {
            output.push_str(&format!(" {:>11}", label(col)));
        }
        output.push('\n');

        for row in 0..self.num_classes {
            output.push_str(&format!("{:>12}", label(row)));
            for col in 0..self.num_classes {
                output.push_str(&format!(" {:>11}", self.get(row, col)));
            }
            output.push('\n');
        }

        output
    }
}
