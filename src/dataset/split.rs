//! Train/test split
//!
//! The split is deterministic for a given seed: samples are grouped by class,
//! each group is shuffled with a seeded ChaCha RNG, and the first
//! `round(n * test_fraction)` samples of every class go to the test set.
//! This keeps the class balance of the source dataset in both halves.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::IrisSample;
use crate::utils::error::{IrisError, Result};

/// Configuration for dataset splitting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of samples held out for testing, in (0, 1)
    pub test_fraction: f64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Keep class proportions equal across train and test
    pub stratified: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            stratified: true,
        }
    }
}

impl SplitConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(IrisError::Config(format!(
                "test_fraction must be between 0.0 and 1.0 (exclusive), got {}",
                self.test_fraction
            )));
        }
        Ok(())
    }
}

/// The two halves of a split
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<IrisSample>,
    pub test: Vec<IrisSample>,
}

/// Split samples into train and test sets
pub fn train_test_split(samples: &[IrisSample], config: &SplitConfig) -> Result<TrainTestSplit> {
    config.validate()?;

    if samples.is_empty() {
        return Err(IrisError::Dataset(
            "No samples provided for splitting".to_string(),
        ));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let (mut train, mut test) = if config.stratified {
        stratified_split(samples, config.test_fraction, &mut rng)
    } else {
        random_split(samples, config.test_fraction, &mut rng)
    };

    if train.is_empty() || test.is_empty() {
        return Err(IrisError::Dataset(format!(
            "Split of {} samples with test_fraction {} leaves an empty side",
            samples.len(),
            config.test_fraction
        )));
    }

    // Interleave classes so neither side is ordered by label
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(TrainTestSplit { train, test })
}

fn stratified_split(
    samples: &[IrisSample],
    test_fraction: f64,
    rng: &mut ChaCha8Rng,
) -> (Vec<IrisSample>, Vec<IrisSample>) {
    // BTreeMap so the RNG is consumed in label order on every run
    let mut by_class: BTreeMap<usize, Vec<IrisSample>> = BTreeMap::new();
    for sample in samples {
        by_class.entry(sample.label).or_default().push(*sample);
    }

    let mut train = Vec::with_capacity(samples.len());
    let mut test = Vec::new();

    for (_, mut class_samples) in by_class {
        class_samples.shuffle(rng);
        let n_test = ((class_samples.len() as f64) * test_fraction).round() as usize;
        let n_test = n_test.min(class_samples.len());

        test.extend_from_slice(&class_samples[..n_test]);
        train.extend_from_slice(&class_samples[n_test..]);
    }

    (train, test)
}

fn random_split(
    samples: &[IrisSample],
    test_fraction: f64,
    rng: &mut ChaCha8Rng,
) -> (Vec<IrisSample>, Vec<IrisSample>) {
    let mut shuffled = samples.to_vec();
    shuffled.shuffle(rng);

    let n_test = ((shuffled.len() as f64) * test_fraction).round() as usize;
    let train = shuffled.split_off(n_test.min(shuffled.len()));
    (train, shuffled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{IrisDataset, NUM_CLASSES};

    fn class_counts(samples: &[IrisSample]) -> [usize; NUM_CLASSES] {
        let mut counts = [0; NUM_CLASSES];
        for s in samples {
            counts[s.label] += 1;
        }
        counts
    }

    #[test]
    fn test_default_split_sizes() {
        let dataset = IrisDataset::builtin().unwrap();
        let split = train_test_split(dataset.samples(), &SplitConfig::default()).unwrap();

        assert_eq!(split.train.len(), 120);
        assert_eq!(split.test.len(), 30);
    }

    #[test]
    fn test_stratified_maintains_class_balance() {
        let dataset = IrisDataset::builtin().unwrap();
        let split = train_test_split(dataset.samples(), &SplitConfig::default()).unwrap();

        assert_eq!(class_counts(&split.test), [10, 10, 10]);
        assert_eq!(class_counts(&split.train), [40, 40, 40]);
    }

    #[test]
    fn test_reproducibility() {
        let dataset = IrisDataset::builtin().unwrap();
        let config = SplitConfig::default();

        let a = train_test_split(dataset.samples(), &config).unwrap();
        let b = train_test_split(dataset.samples(), &config).unwrap();
        assert_eq!(a.train, b.train);
        assert_eq!(a.test, b.test);

        let other = SplitConfig {
            seed: 7,
            ..config
        };
        let c = train_test_split(dataset.samples(), &other).unwrap();
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_random_split_partitions_everything() {
        let dataset = IrisDataset::builtin().unwrap();
        let config = SplitConfig {
            stratified: false,
            test_fraction: 0.3,
            ..SplitConfig::default()
        };
        let split = train_test_split(dataset.samples(), &config).unwrap();
        assert_eq!(split.test.len(), 45);
        assert_eq!(split.train.len() + split.test.len(), 150);
    }

    #[test]
    fn test_invalid_fraction() {
        let dataset = IrisDataset::builtin().unwrap();
        for fraction in [0.0, 1.0, -0.1, 1.5] {
            let config = SplitConfig {
                test_fraction: fraction,
                ..SplitConfig::default()
            };
            let err = train_test_split(dataset.samples(), &config).unwrap_err();
            assert!(matches!(err, IrisError::Config(_)));
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(train_test_split(&[], &SplitConfig::default()).is_err());
    }
}
