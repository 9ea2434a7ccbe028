use super::kmeans::{self, KMeansConfig, KMeansFit};
use super::scaler::StandardScaler;
use crate::config::RegimeEnvConfig;
use crate::domain::errors::RegimeError;
use crate::domain::market::feature_vector::FeatureHistory;
use crate::domain::market::market_regime::{RegimeAssignment, RegimeUnavailable};
use crate::domain::ml::feature_registry::{CLUSTER_FEATURES, Feature};
use ndarray::{Array2, Axis};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct RegimeConfig {
    pub clusters: usize,
    pub window: usize,
    pub min_window: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self::from(&RegimeEnvConfig::default())
    }
}

impl From<&RegimeEnvConfig> for RegimeConfig {
    fn from(config: &RegimeEnvConfig) -> Self {
        Self {
            clusters: config.clusters,
            window: config.window,
            min_window: config.min_window,
            seed: config.seed,
            n_init: config.n_init,
            max_iter: 300,
            tol: 1e-4,
        }
    }
}

/// Clusters the trailing feature window and labels the latest observation.
///
/// Stateless: every call refits from the history it is given, with a fixed seed, so
/// identical inputs always produce the same assignment.
#[derive(Debug, Clone, Default)]
pub struct RegimeDetector {
    config: RegimeConfig,
}

impl RegimeDetector {
    pub fn new(config: RegimeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Never fails: anything that prevents clustering yields a null regime with the
    /// reason attached.
    pub fn detect(&self, history: &FeatureHistory) -> RegimeAssignment {
        let rows: Vec<Vec<f64>> = history
            .rows()
            .iter()
            .filter_map(|r| r.select(CLUSTER_FEATURES).ok())
            .collect();
        let window = &rows[rows.len().saturating_sub(self.config.window)..];
        let observations = window.len();

        if observations < self.config.min_window.max(1) {
            debug!(
                "Regime unavailable: {} complete observations < {}",
                observations, self.config.min_window
            );
            return RegimeAssignment::unavailable(
                RegimeUnavailable::InsufficientHistory {
                    observations,
                    required: self.config.min_window,
                },
                observations,
            );
        }

        match self.cluster(window) {
            Ok(assignment) => {
                info!(
                    "Regime {:?} assigned from {} observations (inertia {:.4})",
                    assignment.cluster_regime,
                    observations,
                    assignment.inertia.unwrap_or(f64::NAN)
                );
                assignment
            }
            Err(RegimeError::Degenerate { distinct, clusters }) => {
                debug!("Regime unavailable: {} distinct rows for {} clusters", distinct, clusters);
                RegimeAssignment::unavailable(
                    RegimeUnavailable::DegenerateInput { distinct, clusters },
                    observations,
                )
            }
            Err(e) => {
                debug!("Regime unavailable: {}", e);
                RegimeAssignment::unavailable(
                    RegimeUnavailable::ClusteringFailed(e.to_string()),
                    observations,
                )
            }
        }
    }

    fn cluster(&self, window: &[Vec<f64>]) -> Result<RegimeAssignment, RegimeError> {
        let width = CLUSTER_FEATURES.len();
        let flat: Vec<f64> = window.iter().flatten().copied().collect();
        let data = Array2::from_shape_vec((window.len(), width), flat).map_err(|e| {
            RegimeError::InvalidInput {
                reason: e.to_string(),
            }
        })?;

        let scaler = StandardScaler::fit(data.view()).ok_or_else(|| RegimeError::InvalidInput {
            reason: "empty window".to_string(),
        })?;
        let scaled = scaler.transform(data.view());

        let fit = kmeans::fit(
            scaled.view(),
            &KMeansConfig {
                clusters: self.config.clusters,
                n_init: self.config.n_init,
                max_iter: self.config.max_iter,
                tol: self.config.tol,
                seed: self.config.seed,
            },
        )?;

        let latest = scaled
            .outer_iter()
            .last()
            .ok_or_else(|| RegimeError::InvalidInput {
                reason: "empty window".to_string(),
            })?;
        let raw_id = fit.predict(latest);
        let order = canonical_order(&fit);
        let cluster = order.iter().position(|id| *id == raw_id).unwrap_or(raw_id);

        let centroids = order
            .iter()
            .map(|id| fit.centroids.row(*id).to_vec())
            .collect();
        Ok(RegimeAssignment::assigned(
            cluster,
            CLUSTER_FEATURES.iter().map(|f| f.as_str().to_string()).collect(),
            centroids,
            window.len(),
            fit.inertia,
        ))
    }
}

/// Raw cluster ids sorted by ascending volatility centroid (ties by raw id).
fn canonical_order(fit: &KMeansFit) -> Vec<usize> {
    let vol_col = CLUSTER_FEATURES
        .iter()
        .position(|f| *f == Feature::Volatility)
        .unwrap_or(0);
    let vols = fit.centroids.index_axis(Axis(1), vol_col);
    let mut order: Vec<usize> = (0..fit.centroids.nrows()).collect();
    order.sort_by(|a, b| vols[*a].total_cmp(&vols[*b]).then(a.cmp(b)));
    order
}
