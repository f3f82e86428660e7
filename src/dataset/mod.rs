//! Dataset module for iris data handling
//!
//! This module provides functionality for:
//! - Loading the bundled 150-sample flower dataset or a CSV export of it
//! - Deterministic, stratified train/test splitting
//! - Descriptive exploration of the features and class balance
//!
//! Every sample carries exactly [`NUM_FEATURES`] measurements in the fixed
//! order of [`FEATURE_NAMES`] and a class id indexing [`CLASS_NAMES`].

pub mod explore;
pub mod loader;
pub mod split;

pub use explore::{DatasetSummary, FeatureStats};
pub use loader::{IrisDataset, IrisSample};
pub use split::{train_test_split, SplitConfig, TrainTestSplit};

/// Number of measurements per flower
pub const NUM_FEATURES: usize = 4;

/// Number of species in the dataset
pub const NUM_CLASSES: usize = 3;

/// Column names, in feature-vector order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "sepal length (cm)",
    "sepal width (cm)",
    "petal length (cm)",
    "petal width (cm)",
];

/// Species names indexed by class id
pub const CLASS_NAMES: [&str; NUM_CLASSES] = ["setosa", "versicolor", "virginica"];

/// One flower's measurements
pub type FeatureVector = [f64; NUM_FEATURES];

/// Get the class name for a given label index
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}

/// Get the label index for a given class name
pub fn class_index(name: &str) -> Option<usize> {
    CLASS_NAMES.iter().position(|&n| n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name() {
        assert_eq!(class_name(0), Some("setosa"));
        assert_eq!(class_name(1), Some("versicolor"));
        assert_eq!(class_name(2), Some("virginica"));
        assert_eq!(class_name(3), None);
    }

    #[test]
    fn test_class_index() {
        assert_eq!(class_index("setosa"), Some(0));
        assert_eq!(class_index("virginica"), Some(2));
        assert_eq!(class_index("Setosa"), None);
    }

    #[test]
    fn test_name_index_roundtrip() {
        for (idx, name) in CLASS_NAMES.iter().enumerate() {
            assert_eq!(class_index(name), Some(idx));
        }
    }
}
