//! Keep-masks for the outlier-filtering ensemble methods.

use crate::application::regime::kmeans::{self, KMeansConfig};
use ndarray::Array2;
use statrs::statistics::Statistics;

/// Predictions within two population standard deviations of the mean.
/// If nothing survives (all values equal) everything is kept.
pub fn sigma_mask(values: &[f64]) -> Vec<bool> {
    if values.len() < 2 {
        return vec![true; values.len()];
    }
    let mean = values.iter().mean();
    let std = values.iter().population_std_dev();
    let mask: Vec<bool> = values
        .iter()
        .map(|v| (v - mean).abs() < 2.0 * std)
        .collect();

    if mask.iter().any(|keep| *keep) {
        mask
    } else {
        vec![true; values.len()]
    }
}

/// Members of the largest cluster of a 1-D, 3-means clustering of the predictions.
/// Size ties go to the cluster with the lowest centroid. With fewer than three
/// distinct values nothing is filtered.
pub fn largest_cluster_mask(values: &[f64], seed: u64) -> Vec<bool> {
    const CLUSTERS: usize = 3;
    if values.len() < CLUSTERS {
        return vec![true; values.len()];
    }

    let Ok(data) = Array2::from_shape_vec((values.len(), 1), values.to_vec()) else {
        return vec![true; values.len()];
    };
    let config = KMeansConfig {
        clusters: CLUSTERS,
        seed,
        ..Default::default()
    };
    let Ok(fit) = kmeans::fit(data.view(), &config) else {
        return vec![true; values.len()];
    };

    let mut sizes = [0usize; CLUSTERS];
    for label in &fit.labels {
        sizes[*label] += 1;
    }
    let largest = (0..CLUSTERS)
        .max_by(|a, b| {
            sizes[*a]
                .cmp(&sizes[*b])
                .then(fit.centroids[[*b, 0]].total_cmp(&fit.centroids[[*a, 0]]))
        })
        .unwrap_or(0);

    fit.labels.iter().map(|l| *l == largest).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigma_mask_drops_far_value() {
        let values = [100.0, 100.2, 99.9, 100.1, 100.0, 99.8, 100.1, 140.0];
        let mask = sigma_mask(&values);
        assert_eq!(mask, vec![true, true, true, true, true, true, true, false]);
    }

    #[test]
    fn test_sigma_mask_keeps_identical_values() {
        assert_eq!(sigma_mask(&[5.0, 5.0, 5.0]), vec![true, true, true]);
        assert_eq!(sigma_mask(&[5.0]), vec![true]);
    }

    #[test]
    fn test_largest_cluster_wins() {
        let values = [100.0, 100.1, 99.9, 100.2, 120.0, 121.0, 80.0];
        let mask = largest_cluster_mask(&values, 42);
        assert_eq!(mask, vec![true, true, true, true, false, false, false]);
    }

    #[test]
    fn test_size_tie_goes_to_lowest_centroid() {
        let values = [10.0, 10.1, 50.0, 50.1, 90.0, 90.1];
        let mask = largest_cluster_mask(&values, 42);
        assert_eq!(mask, vec![true, true, false, false, false, false]);
    }

    #[test]
    fn test_too_few_distinct_values_keeps_all() {
        assert_eq!(largest_cluster_mask(&[1.0, 1.0, 2.0, 2.0], 42), vec![true; 4]);
        assert_eq!(largest_cluster_mask(&[1.0, 2.0], 42), vec![true; 2]);
    }
}
