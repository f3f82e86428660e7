//! Multinomial logistic regression
//!
//! Softmax regression fitted with full-batch gradient descent on
//! standardised features. The objective matches the usual L2-penalised
//! formulation with inverse regularisation strength `C`:
//!
//! ```text
//! mean cross-entropy + ||W||^2 / (2 * C * n)
//! ```
//!
//! The intercept is not penalised.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Classifier;
use crate::dataset::{FeatureVector, IrisSample, NUM_CLASSES, NUM_FEATURES};
use crate::utils::error::{IrisError, Result};

/// Solver hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogisticRegressionConfig {
    /// Inverse regularisation strength, must be positive
    #[serde(rename = "C")]
    pub c: f64,
    /// Maximum gradient descent iterations
    pub max_iter: usize,
    /// Gradient descent step size
    pub learning_rate: f64,
    /// Stop once the largest absolute gradient component falls below this
    pub tolerance: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.5,
            tolerance: 1e-5,
        }
    }
}

impl LogisticRegressionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(IrisError::Config(format!("C must be positive, got {}", self.c)));
        }
        if self.max_iter == 0 {
            return Err(IrisError::Config("max_iter must be at least 1".to_string()));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(IrisError::Config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if self.tolerance < 0.0 {
            return Err(IrisError::Config("tolerance must not be negative".to_string()));
        }
        Ok(())
    }
}

/// Fitted model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogisticRegression {
    config: LogisticRegressionConfig,
    /// Per-feature mean used for standardisation
    mean: Array1<f64>,
    /// Per-feature scale used for standardisation (never zero)
    scale: Array1<f64>,
    /// (features, classes)
    weights: Array2<f64>,
    /// (classes)
    bias: Array1<f64>,
    /// Iterations run before convergence or `max_iter`
    n_iter: usize,
}

impl LogisticRegression {
    /// Fit on labeled samples
    pub fn fit(samples: &[IrisSample], config: LogisticRegressionConfig) -> Result<Self> {
        config.validate()?;

        if samples.is_empty() {
            return Err(IrisError::Model("cannot fit on an empty sample set".to_string()));
        }
        if let Some(bad) = samples.iter().find(|s| s.label >= NUM_CLASSES) {
            return Err(IrisError::Model(format!(
                "label {} outside 0..{}",
                bad.label, NUM_CLASSES
            )));
        }

        let n = samples.len();
        let x = Array2::from_shape_fn((n, NUM_FEATURES), |(i, j)| samples[i].features[j]);

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| IrisError::Model("cannot compute feature means".to_string()))?;
        let scale = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > f64::EPSILON { s } else { 1.0 });
        let xs = (&x - &mean) / &scale;

        let mut y = Array2::<f64>::zeros((n, NUM_CLASSES));
        for (i, sample) in samples.iter().enumerate() {
            y[[i, sample.label]] = 1.0;
        }

        let mut weights = Array2::<f64>::zeros((NUM_FEATURES, NUM_CLASSES));
        let mut bias = Array1::<f64>::zeros(NUM_CLASSES);
        let penalty = 1.0 / (config.c * n as f64);
        let mut n_iter = config.max_iter;

        for iter in 0..config.max_iter {
            let probs = softmax_rows(xs.dot(&weights) + &bias);
            let residual = &probs - &y;

            let grad_w = xs.t().dot(&residual) / n as f64 + &weights * penalty;
            let grad_b = residual.sum_axis(Axis(0)) / n as f64;

            weights.scaled_add(-config.learning_rate, &grad_w);
            bias.scaled_add(-config.learning_rate, &grad_b);

            let max_grad = grad_w
                .iter()
                .chain(grad_b.iter())
                .fold(0.0_f64, |acc, g| acc.max(g.abs()));

            if iter % 100 == 0 {
                debug!(
                    "iter {}: loss {:.6}, max |grad| {:.2e}",
                    iter,
                    cross_entropy(&probs, &y),
                    max_grad
                );
            }

            if max_grad < config.tolerance {
                n_iter = iter + 1;
                break;
            }
        }

        debug!("Logistic regression fitted in {} iterations", n_iter);

        Ok(Self {
            config,
            mean,
            scale,
            weights,
            bias,
            n_iter,
        })
    }

    /// Class probabilities, one row per input
    pub fn predict_proba(&self, features: &[FeatureVector]) -> Result<Array2<f64>> {
        let n = features.len();
        let x = Array2::from_shape_fn((n, NUM_FEATURES), |(i, j)| features[i][j]);
        let xs = (&x - &self.mean) / &self.scale;
        let probs = softmax_rows(xs.dot(&self.weights) + &self.bias);

        if let Some(row) = probs
            .rows()
            .into_iter()
            .position(|row| row.iter().any(|p| !p.is_finite()))
        {
            return Err(IrisError::Inference(format!(
                "non-finite class probabilities for input {row}"
            )));
        }
        Ok(probs)
    }

    /// Fraction of samples predicted correctly
    pub fn score(&self, samples: &[IrisSample]) -> Result<f64> {
        if samples.is_empty() {
            return Ok(0.0);
        }
        let features: Vec<FeatureVector> = samples.iter().map(|s| s.features).collect();
        let predictions = Classifier::predict(self, &features)?;
        let correct = predictions
            .iter()
            .zip(samples)
            .filter(|(p, s)| **p == s.label)
            .count();
        Ok(correct as f64 / samples.len() as f64)
    }

    pub fn config(&self) -> &LogisticRegressionConfig {
        &self.config
    }

    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    /// Check parameter shapes and values after deserialisation
    pub fn validate(&self) -> Result<()> {
        let shape_error = |what: &str, got: String| {
            IrisError::Model(format!("invalid {what}: got {got}"))
        };

        if self.mean.len() != NUM_FEATURES {
            return Err(shape_error("mean length", self.mean.len().to_string()));
        }
        if self.scale.len() != NUM_FEATURES {
            return Err(shape_error("scale length", self.scale.len().to_string()));
        }
        if self.weights.dim() != (NUM_FEATURES, NUM_CLASSES) {
            return Err(shape_error("weights shape", format!("{:?}", self.weights.dim())));
        }
        if self.bias.len() != NUM_CLASSES {
            return Err(shape_error("bias length", self.bias.len().to_string()));
        }
        if self.scale.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(IrisError::Model("scale must be positive and finite".to_string()));
        }

        let all_finite = self
            .mean
            .iter()
            .chain(self.weights.iter())
            .chain(self.bias.iter())
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(IrisError::Model("parameters contain non-finite values".to_string()));
        }

        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<usize>> {
        let probs = self.predict_proba(features)?;
        Ok(probs.rows().into_iter().map(|row| argmax(row.iter())).collect())
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }
}

/// Numerically stable row-wise softmax
fn softmax_rows(mut logits: Array2<f64>) -> Array2<f64> {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row.mapv_inplace(|v| v / sum);
    }
    logits
}

fn cross_entropy(probs: &Array2<f64>, one_hot: &Array2<f64>) -> f64 {
    let n = probs.nrows().max(1) as f64;
    -probs
        .iter()
        .zip(one_hot.iter())
        .filter(|(_, y)| **y > 0.0)
        .map(|(&p, _)| p.max(1e-15).ln())
        .sum::<f64>()
        / n
}

/// Index of the largest value; first index wins ties
fn argmax<'a>(values: impl Iterator<Item = &'a f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (idx, &value) in values.enumerate() {
        if value > best_value {
            best = idx;
            best_value = value;
        }
    }
    best
}
