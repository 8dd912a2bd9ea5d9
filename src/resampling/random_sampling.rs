//! Random undersampling

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{class_counts, class_indices, ResampleResult, Sampler};
use crate::error::{PipelineError, Result};

/// Cuts every majority class down to the minority count by sampling rows
/// without replacement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomUnderSampler {
    seed: u64,
    target_count: Option<usize>,
}

impl RandomUnderSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            target_count: None,
        }
    }
}

impl Sampler for RandomUnderSampler {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(PipelineError::Preprocessing(
                "Undersampling needs at least 2 classes".to_string(),
            ));
        }

        self.target_count = counts.values().min().copied();
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let target = self.target_count.ok_or(PipelineError::ModelNotFitted)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices: BTreeMap<i64, Vec<usize>> = class_indices(y);

        // Per class, keep `target` rows; original row order is preserved
        let mut keep: Vec<usize> = Vec::new();
        for class_idx in indices.values() {
            let mut chosen = class_idx.clone();
            chosen.shuffle(&mut rng);
            chosen.truncate(target);
            chosen.sort_unstable();
            keep.extend(chosen);
        }
        keep.sort_unstable();

        let result_x = x.select(Axis(0), &keep);
        let result_y: Array1<i64> = keep.iter().map(|&i| y[i]).collect();
        let n_synthetic = vec![0; indices.len()];

        Ok(ResampleResult {
            x: result_x,
            y: result_y,
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imbalanced_data() -> (Array2<f64>, Array1<i64>) {
        let x = Array2::from_shape_fn((12, 2), |(i, j)| (i * 2 + j) as f64);
        let y = Array1::from_vec(vec![0i64, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1]);
        (x, y)
    }

    #[test]
    fn test_undersampling_balances_to_minority() {
        let (x, y) = imbalanced_data();
        let mut sampler = RandomUnderSampler::new(42);
        let result = sampler.fit_resample(&x, &y).unwrap();

        let counts = class_counts(&result.y);
        assert_eq!(counts[&0], 4);
        assert_eq!(counts[&1], 4);
        assert_eq!(result.x.nrows(), 8);
        assert_eq!(result.n_synthetic, vec![0, 0]);
    }

    #[test]
    fn test_kept_rows_are_originals() {
        let (x, y) = imbalanced_data();
        let mut sampler = RandomUnderSampler::new(42);
        let result = sampler.fit_resample(&x, &y).unwrap();

        // Every kept row must exist verbatim in the source matrix
        for row in result.x.rows() {
            let found = x.rows().into_iter().any(|orig| orig == row);
            assert!(found);
        }
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let (x, y) = imbalanced_data();
        let a = RandomUnderSampler::new(3).fit_resample(&x, &y).unwrap();
        let b = RandomUnderSampler::new(3).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
    }

    #[test]
    fn test_single_class_error() {
        let x = Array2::zeros((4, 2));
        let y = Array1::from_vec(vec![1i64; 4]);
        let mut sampler = RandomUnderSampler::new(42);
        assert!(sampler.fit(&x, &y).is_err());
    }
}
