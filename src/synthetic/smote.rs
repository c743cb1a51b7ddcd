//! SMOTE (Synthetic Minority Over-sampling Technique)

use crate::error::{PipelineError, Result};
use crate::synthetic::{class_counts, class_indices, ResampleResult, Sampler};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use tracing::{debug, info};

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    // Ties broken by index so neighbour sets do not depend on scan order
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// SMOTE sampler balancing every class up to the majority count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: Option<u64>,
    /// Target samples per class
    target_counts: Option<BTreeMap<i64, usize>>,
}

impl SMOTE {
    /// Create new SMOTE sampler with 5 neighbors
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: None,
            target_counts: None,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Configured neighbor count
    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// Minimum class size SMOTE can work with: the row plus its k neighbors
    pub fn required_class_size(&self) -> usize {
        self.k_neighbors + 1
    }

    /// Squared Euclidean distance
    fn distance(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum::<f64>()
    }

    /// k nearest neighbors of `data[point_idx]` within `data`, excluding itself.
    /// BinaryHeap keeps this at O(n log k).
    fn find_neighbors(point_idx: usize, data: &[Vec<f64>], k: usize) -> Vec<usize> {
        let point = &data[point_idx];
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, d) in data.iter().enumerate() {
            if i == point_idx {
                continue;
            }
            let candidate = DistIdx(Self::distance(point, d), i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(max) = heap.peek() {
                if candidate < *max {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|DistIdx(_, i)| i).collect()
    }

    /// Generate synthetic sample between two points
    fn generate_sample(point: &[f64], neighbor: &[f64], rng: &mut StdRng) -> Vec<f64> {
        let gap: f64 = rng.gen();
        point
            .iter()
            .zip(neighbor.iter())
            .map(|(&p, &n)| p + gap * (n - p))
            .collect()
    }
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl Sampler for SMOTE {
    fn fit(&mut self, _x: &Array2<f64>, y: &Array1<i64>) -> Result<()> {
        let counts = class_counts(y);

        if counts.len() < 2 {
            // A single label present means the other binary class has zero rows
            let missing = match counts.keys().next() {
                Some(&0) => 1,
                Some(_) => 0,
                None => 1,
            };
            return Err(PipelineError::InsufficientMinorityClass {
                class: missing,
                minority_count: 0,
                required: self.required_class_size(),
            });
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        let required = self.required_class_size();

        let mut targets = BTreeMap::new();
        for (&class, &count) in &counts {
            if count < max_count && count < required {
                return Err(PipelineError::InsufficientMinorityClass {
                    class,
                    minority_count: count,
                    required,
                });
            }
            targets.insert(class, max_count);
        }

        debug!(?counts, target = max_count, "SMOTE fitted");
        self.target_counts = Some(targets);
        Ok(())
    }

    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        let targets = self
            .target_counts
            .as_ref()
            .ok_or_else(|| PipelineError::Training("SMOTE resample called before fit".to_string()))?;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let indices = class_indices(y);
        let counts = class_counts(y);
        let n_features = x.ncols();

        // Collect only synthetic samples (original data reused from x directly)
        let mut synthetic_x: Vec<Vec<f64>> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = BTreeMap::new();

        for (&class, &target_count) in targets {
            let current_count = counts.get(&class).copied().unwrap_or(0);
            let n_to_generate = target_count.saturating_sub(current_count);
            n_synthetic.insert(class, n_to_generate);

            if n_to_generate == 0 {
                continue;
            }

            let class_idx = match indices.get(&class) {
                Some(idx) => idx,
                None => continue,
            };
            let class_samples: Vec<Vec<f64>> = class_idx
                .iter()
                .map(|&i| x.row(i).iter().copied().collect())
                .collect();

            let k = self.k_neighbors.min(class_samples.len() - 1);

            // Neighbor lists depend only on the data, so compute them up front in parallel
            let neighbors: Vec<Vec<usize>> = (0..class_samples.len())
                .into_par_iter()
                .map(|i| Self::find_neighbors(i, &class_samples, k))
                .collect();

            for _ in 0..n_to_generate {
                let idx = rng.gen_range(0..class_samples.len());
                let candidates = &neighbors[idx];
                let neighbor_idx = candidates[rng.gen_range(0..candidates.len())];

                synthetic_x.push(Self::generate_sample(
                    &class_samples[idx],
                    &class_samples[neighbor_idx],
                    &mut rng,
                ));
                synthetic_y.push(class);
            }

            info!(class, original = current_count, synthetic = n_to_generate, "Minority class oversampled");
        }

        // Build result: original rows + synthetic rows using from_shape_fn
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
