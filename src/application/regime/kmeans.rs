//! Seeded k-means with k-means++ initialization and parallel restarts.

use crate::domain::errors::RegimeError;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansConfig {
    pub clusters: usize,
    pub n_init: usize,
    pub max_iter: usize,
    /// Convergence threshold on total squared centroid shift, relative to the mean
    /// column variance
    pub tol: f64,
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            clusters: 3,
            n_init: 10,
            max_iter: 300,
            tol: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    pub centroids: Array2<f64>,
    pub labels: Vec<usize>,
    pub inertia: f64,
    pub iterations: usize,
}

impl KMeansFit {
    pub fn predict(&self, point: ArrayView1<f64>) -> usize {
        nearest(&self.centroids, point).0
    }
}

/// Best of `n_init` seeded runs by inertia; ties keep the lowest restart index.
pub fn fit(data: ArrayView2<f64>, config: &KMeansConfig) -> Result<KMeansFit, RegimeError> {
    validate(data, config)?;

    let tol = absolute_tolerance(data, config.tol);
    let runs: Vec<KMeansFit> = (0..config.n_init.max(1))
        .into_par_iter()
        .map(|restart| {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(restart as u64));
            lloyd(data, plus_plus_init(data, config.clusters, &mut rng), config.max_iter, tol)
        })
        .collect();

    runs.into_iter()
        .reduce(|best, run| if run.inertia < best.inertia { run } else { best })
        .ok_or_else(|| RegimeError::InvalidInput {
            reason: "no restarts ran".to_string(),
        })
}

fn validate(data: ArrayView2<f64>, config: &KMeansConfig) -> Result<(), RegimeError> {
    if config.clusters == 0 {
        return Err(RegimeError::InvalidInput {
            reason: "cluster count must be positive".to_string(),
        });
    }
    if data.ncols() == 0 {
        return Err(RegimeError::InvalidInput {
            reason: "no feature columns".to_string(),
        });
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(RegimeError::InvalidInput {
            reason: "non-finite value".to_string(),
        });
    }

    let distinct = data
        .outer_iter()
        .map(|row| row.iter().map(|v| v.to_bits()).collect::<Vec<u64>>())
        .collect::<HashSet<_>>()
        .len();
    if distinct < config.clusters {
        return Err(RegimeError::Degenerate {
            distinct,
            clusters: config.clusters,
        });
    }
    Ok(())
}

fn absolute_tolerance(data: ArrayView2<f64>, tol: f64) -> f64 {
    let mean_variance = data
        .var_axis(Axis(0), 0.0)
        .mean()
        .unwrap_or(0.0);
    if mean_variance > 0.0 { tol * mean_variance } else { tol }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Index and squared distance of the closest centroid; ties go to the lower index.
fn nearest(centroids: &Array2<f64>, point: ArrayView1<f64>) -> (usize, f64) {
    centroids
        .outer_iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

fn plus_plus_init(data: ArrayView2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::zeros((k, data.ncols()));
    let first = rng.random_range(0..n);
    centroids.row_mut(0).assign(&data.row(first));

    let mut closest: Vec<f64> = data
        .outer_iter()
        .map(|row| squared_distance(row, data.row(first)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let target = rng.random::<f64>() * total;
            let mut acc = 0.0;
            closest
                .iter()
                .position(|d| {
                    acc += d;
                    acc > target
                })
                .unwrap_or_else(|| closest.iter().rposition(|d| *d > 0.0).unwrap_or(n - 1))
        } else {
            rng.random_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        for (i, row) in data.outer_iter().enumerate() {
            closest[i] = closest[i].min(squared_distance(row, data.row(chosen)));
        }
    }
    centroids
}

fn assign(data: ArrayView2<f64>, centroids: &Array2<f64>) -> (Vec<usize>, Vec<f64>) {
    data.outer_iter().map(|row| nearest(centroids, row)).unzip()
}

fn lloyd(data: ArrayView2<f64>, mut centroids: Array2<f64>, max_iter: usize, tol: f64) -> KMeansFit {
    let k = centroids.nrows();
    let mut iterations = 0;

    for _ in 0..max_iter {
        iterations += 1;
        let (labels, distances) = assign(data, &centroids);

        let mut sums = Array2::<f64>::zeros(centroids.raw_dim());
        let mut counts = vec![0usize; k];
        for (row, &label) in data.outer_iter().zip(&labels) {
            let mut sum = sums.row_mut(label);
            sum += &row;
            counts[label] += 1;
        }

        let mut updated = centroids.clone();
        let mut taken: HashSet<usize> = HashSet::new();
        for c in 0..k {
            if counts[c] > 0 {
                updated.row_mut(c).assign(&(&sums.row(c) / counts[c] as f64));
            } else {
                // Empty cluster: move it to the point worst served by its centroid.
                let far = distances
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !taken.contains(i))
                    .fold((0, f64::NEG_INFINITY), |best, (i, d)| if *d > best.1 { (i, *d) } else { best })
                    .0;
                taken.insert(far);
                updated.row_mut(c).assign(&data.row(far));
            }
        }

        let shift: f64 = centroids
            .outer_iter()
            .zip(updated.outer_iter())
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = updated;
        if shift <= tol {
            break;
        }
    }

    let (labels, distances) = assign(data, &centroids);
    KMeansFit {
        centroids,
        labels,
        inertia: distances.iter().sum(),
        iterations,
    }
}
