//! Classifier models
//!
//! [`Classifier`] is the whole contract the prediction service relies on: a
//! read-only handle that maps feature vectors to class ids. The only
//! concrete model is a multinomial [`LogisticRegression`].

pub mod artifact;
pub mod logistic;

pub use artifact::ModelArtifact;
pub use logistic::{LogisticRegression, LogisticRegressionConfig};

use crate::dataset::FeatureVector;
use crate::utils::error::Result;

/// A fitted, immutable classifier
///
/// Implementations must be safe to share across request handlers without
/// locking, and `predict` must return exactly one class id per input row in
/// input order.
pub trait Classifier: Send + Sync {
    /// Predict a class id for every feature vector
    fn predict(&self, features: &[FeatureVector]) -> Result<Vec<usize>>;

    /// Short human-readable model family name
    fn kind(&self) -> &'static str;
}
