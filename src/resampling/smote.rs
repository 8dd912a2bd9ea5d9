//! SMOTE oversampling and the SMOTE + Tomek-link combination

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::{class_counts, class_indices, ResampleResult, Sampler};
use crate::error::{PipelineError, Result};

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(ai, bi)| (ai - bi).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// SMOTE: synthetic minority oversampling via k-nearest-neighbor
/// interpolation. Minority classes are raised to the majority count;
/// synthetic rows are appended after the originals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Smote {
    k_neighbors: usize,
    seed: u64,
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl Smote {
    pub fn new(seed: u64) -> Self {
        Self {
            k_neighbors: 5,
            seed,
            target_counts: None,
        }
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// k nearest same-class neighbors, excluding the point itself.
    fn find_neighbors(point: &[f64], data: &[Vec<f64>], k: usize) -> Vec<usize> {
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, d) in data.iter().enumerate() {
            let dist = distance(point, d);
            if dist <= 0.0 {
                continue;
            }
            if heap.len() < k {
                heap.push(DistIdx(dist, i));
            } else if let Some(&DistIdx(max_dist, _)) = heap.peek() {
                if dist < max_dist {
                    heap.pop();
                    heap.push(DistIdx(dist, i));
                }
            }
        }

        heap.into_iter().map(|DistIdx(_, i)| i).collect()
    }

    fn interpolate(point: &[f64], neighbor: &[f64], rng: &mut ChaCha8Rng) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Sampler for Smote {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            return Err(PipelineError::Preprocessing(
                "SMOTE needs at least 2 classes".to_string(),
            ));
        }

        let max_count = *counts.values().max().unwrap_or(&0);
        let targets = counts
            .iter()
            .map(|(&class, &count)| (class, max_count.max(count)))
            .collect();

        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or(PipelineError::ModelNotFitted)?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let indices = class_indices(y);
        let counts = class_counts(y);
        let n_features = x.ncols();

        let mut synthetic_x: Vec<Vec<f64>> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = Vec::new();

        for (&class, &target_count) in targets {
            let current_count = counts.get(&class).copied().unwrap_or(0);
            let n_to_generate = target_count.saturating_sub(current_count);

            if n_to_generate == 0 {
                n_synthetic.push(0);
                continue;
            }

            let class_idx = indices.get(&class).ok_or_else(|| {
                PipelineError::Preprocessing(format!("Class {} absent from labels", class))
            })?;
            if class_idx.len() < 2 {
                return Err(PipelineError::Preprocessing(format!(
                    "Class {} has only {} sample(s); SMOTE needs at least 2",
                    class,
                    class_idx.len()
                )));
            }

            let class_samples: Vec<Vec<f64>> = class_idx
                .iter()
                .map(|&i| x.row(i).iter().copied().collect())
                .collect();

            let k = self.k_neighbors.min(class_samples.len() - 1).max(1);

            let mut generated = 0;
            while generated < n_to_generate {
                let idx = rng.gen_range(0..class_samples.len());
                let sample = &class_samples[idx];

                let neighbors = Self::find_neighbors(sample, &class_samples, k);
                if neighbors.is_empty() {
                    // All duplicates of this point; reuse it verbatim
                    synthetic_x.push(sample.clone());
                    synthetic_y.push(class);
                    generated += 1;
                    continue;
                }

                let neighbor = &class_samples[neighbors[rng.gen_range(0..neighbors.len())]];
                synthetic_x.push(Self::interpolate(sample, neighbor, &mut rng));
                synthetic_y.push(class);
                generated += 1;
            }

            n_synthetic.push(n_to_generate);
        }

        let n_original = x.nrows();
        let n_total = n_original + synthetic_x.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[i - n_original][j]
            }
        });

        let mut all_y: Vec<i64> = y.iter().copied().collect();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}

/// SMOTE followed by Tomek-link removal: after oversampling, pairs of
/// mutual nearest neighbors with opposite labels are dropped to clean the
/// class boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmoteTomek {
    smote: Smote,
}

impl SmoteTomek {
    pub fn new(seed: u64) -> Self {
        Self {
            smote: Smote::new(seed),
        }
    }

    /// Index of each row's nearest neighbor (excluding itself).
    fn nearest_neighbors(x: &Array2<f64>) -> Vec<usize> {
        let rows: Vec<Vec<f64>> = x
            .axis_iter(Axis(0))
            .map(|r| r.iter().copied().collect())
            .collect();

        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let mut best = (f64::INFINITY, i);
                for (j, other) in rows.iter().enumerate() {
                    if i == j {
                        continue;
                    }
                    let d = distance(row, other);
                    if d < best.0 {
                        best = (d, j);
                    }
                }
                best.1
            })
            .collect()
    }
}

impl Sampler for SmoteTomek {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        self.smote.fit(x, y)
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let oversampled = self.smote.resample(x, y)?;

        let nn = Self::nearest_neighbors(&oversampled.x);
        let n = oversampled.y.len();
        let mut remove = vec![false; n];
        for i in 0..n {
            let j = nn[i];
            // Tomek link: mutual nearest neighbors with opposite labels
            if nn[j] == i && oversampled.y[i] != oversampled.y[j] {
                remove[i] = true;
                remove[j] = true;
            }
        }

        let keep: Vec<usize> = (0..n).filter(|&i| !remove[i]).collect();
        if keep.is_empty() {
            return Err(PipelineError::Preprocessing(
                "Tomek-link cleanup removed every sample".to_string(),
            ));
        }

        let cleaned_x = oversampled.x.select(Axis(0), &keep);
        let cleaned_y: Array1<i64> = keep.iter().map(|&i| oversampled.y[i]).collect();

        Ok(ResampleResult {
            x: cleaned_x,
            y: cleaned_y,
            n_synthetic: oversampled.n_synthetic,
        })
    }
}
