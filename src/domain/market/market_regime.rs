use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a regime could not be assigned for a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeUnavailable {
    /// Fewer complete observations than the detector's minimum window
    InsufficientHistory { observations: usize, required: usize },
    /// The window has fewer distinct points than requested clusters
    DegenerateInput { distinct: usize, clusters: usize },
    /// The clustering run itself errored
    ClusteringFailed(String),
}

impl fmt::Display for RegimeUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegimeUnavailable::InsufficientHistory {
                observations,
                required,
            } => write!(
                f,
                "insufficient history: {} observations < {} required",
                observations, required
            ),
            RegimeUnavailable::DegenerateInput { distinct, clusters } => write!(
                f,
                "degenerate input: {} distinct observations for {} clusters",
                distinct, clusters
            ),
            RegimeUnavailable::ClusteringFailed(reason) => {
                write!(f, "clustering failed: {}", reason)
            }
        }
    }
}

/// Regime of the latest observation plus the cluster metadata needed to read it.
///
/// Centroids live in standardized feature space, ordered by cluster id. Ids are
/// canonical: sorted by ascending volatility centroid, so id 0 is the calmest regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeAssignment {
    pub cluster_regime: Option<usize>,
    pub feature_names: Vec<String>,
    pub centroids: Vec<Vec<f64>>,
    pub observations: usize,
    pub inertia: Option<f64>,
    pub unavailable: Option<RegimeUnavailable>,
}

impl RegimeAssignment {
    pub fn assigned(
        cluster: usize,
        feature_names: Vec<String>,
        centroids: Vec<Vec<f64>>,
        observations: usize,
        inertia: f64,
    ) -> Self {
        Self {
            cluster_regime: Some(cluster),
            feature_names,
            centroids,
            observations,
            inertia: Some(inertia),
            unavailable: None,
        }
    }

    /// Degraded mode: no regime, forecast proceeds under fallback weighting.
    pub fn unavailable(reason: RegimeUnavailable, observations: usize) -> Self {
        Self {
            cluster_regime: None,
            feature_names: Vec::new(),
            centroids: Vec::new(),
            observations,
            inertia: None,
            unavailable: Some(reason),
        }
    }

    pub fn is_available(&self) -> bool {
        self.cluster_regime.is_some()
    }

    /// Centroid of the assigned cluster, if any
    pub fn centroid(&self) -> Option<&[f64]> {
        self.cluster_regime
            .and_then(|id| self.centroids.get(id))
            .map(|c| c.as_slice())
    }
}
