//! Class-balance resampling for the training partition
//!
//! Three strategies: SMOTE oversampling, random undersampling, and SMOTE
//! followed by Tomek-link cleanup. All samplers take an explicit seed and
//! iterate classes in ascending order, so a given seed always produces the
//! same resampled matrix.

pub mod random_sampling;
pub mod smote;

pub use random_sampling::RandomUnderSampler;
pub use smote::{Smote, SmoteTomek};

use std::collections::BTreeMap;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Resampled features
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<i64>,
    /// Synthetic samples generated per class, ascending class order
    pub n_synthetic: Vec<usize>,
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult>;

    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Class distribution, ascending class order.
pub fn class_counts(y: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Row indices per class, ascending class order.
pub fn class_indices(y: &Array1<i64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

/// Named balancing strategies accepted by the preprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BalanceMethod {
    Smote,
    Undersample,
    SmoteTomek,
}

impl FromStr for BalanceMethod {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "smote" => Ok(BalanceMethod::Smote),
            "undersample" => Ok(BalanceMethod::Undersample),
            "smotetomek" | "smote-tomek" => Ok(BalanceMethod::SmoteTomek),
            other => Err(PipelineError::Config(format!(
                "Unknown balancing method '{}' (expected 'smote', 'undersample', or 'smotetomek')",
                other
            ))),
        }
    }
}

impl BalanceMethod {
    /// Construct the sampler this method names.
    pub fn build(&self, seed: u64) -> Box<dyn Sampler> {
        match self {
            BalanceMethod::Smote => Box::new(Smote::new(seed)),
            BalanceMethod::Undersample => Box::new(RandomUnderSampler::new(seed)),
            BalanceMethod::SmoteTomek => Box::new(SmoteTomek::new(seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_class_counts() {
        let y = array![0i64, 0, 1, 1, 1, 0, 1];
        let counts = class_counts(&y);
        assert_eq!(counts[&0], 3);
        assert_eq!(counts[&1], 4);
    }

    #[test]
    fn test_class_indices() {
        let y = array![1i64, 0, 1];
        let indices = class_indices(&y);
        assert_eq!(indices[&0], vec![1]);
        assert_eq!(indices[&1], vec![0, 2]);
    }

    #[test]
    fn test_balance_method_parsing() {
        assert_eq!("smote".parse::<BalanceMethod>().unwrap(), BalanceMethod::Smote);
        assert_eq!("SMOTETomek".parse::<BalanceMethod>().unwrap(), BalanceMethod::SmoteTomek);
        assert_eq!("undersample".parse::<BalanceMethod>().unwrap(), BalanceMethod::Undersample);
        assert!("adasyn".parse::<BalanceMethod>().is_err());
    }
}
