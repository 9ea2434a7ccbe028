use crate::domain::errors::WeightTableError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RawWeightTable {
    #[serde(default)]
    default_weight: f64,
    #[serde(default)]
    regimes: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Per-regime strategy weights, configured out of band.
///
/// ```toml
/// default_weight = 0.0
///
/// [regimes.0]
/// LinearRegression = 2.0
/// XGBoost = 1.0
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegimeWeightTable {
    default_weight: f64,
    regimes: BTreeMap<usize, BTreeMap<String, f64>>,
}

impl RegimeWeightTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeightTableError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| WeightTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_toml_str(&content)?;
        info!(
            "Loaded regime weight table from {} ({} regimes)",
            path.display(),
            table.regimes.len()
        );
        Ok(table)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, WeightTableError> {
        let raw: RawWeightTable = toml::from_str(content)?;
        check_weight("default", "default_weight", raw.default_weight)?;

        let mut regimes = BTreeMap::new();
        for (key, weights) in raw.regimes {
            let id = key
                .trim()
                .parse::<usize>()
                .map_err(|_| WeightTableError::InvalidRegime(key.clone()))?;
            for (strategy, weight) in &weights {
                check_weight(&key, strategy, *weight)?;
            }
            regimes.insert(id, weights);
        }

        Ok(Self {
            default_weight: raw.default_weight,
            regimes,
        })
    }

    pub fn with_regime(mut self, regime: usize, weights: BTreeMap<String, f64>) -> Self {
        self.regimes.insert(regime, weights);
        self
    }

    pub fn default_weight(&self) -> f64 {
        self.default_weight
    }

    pub fn regimes(&self) -> impl Iterator<Item = &usize> {
        self.regimes.keys()
    }

    /// Weights of `survivors` in `regime`, renormalized to sum to 1.
    ///
    /// `None` when the regime has no entry or the survivors carry no weight mass;
    /// the caller then falls back to equal weighting.
    pub fn weights_for(&self, regime: usize, survivors: &[&str]) -> Option<BTreeMap<String, f64>> {
        let table = self.regimes.get(&regime)?;
        let raw: Vec<(&str, f64)> = survivors
            .iter()
            .map(|name| (*name, table.get(*name).copied().unwrap_or(self.default_weight)))
            .collect();

        let mass: f64 = raw.iter().map(|(_, w)| w).sum();
        if !(mass > 0.0 && mass.is_finite()) {
            return None;
        }
        Some(
            raw.into_iter()
                .map(|(name, w)| (name.to_string(), w / mass))
                .collect(),
        )
    }
}

fn check_weight(regime: &str, strategy: &str, weight: f64) -> Result<(), WeightTableError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(WeightTableError::InvalidWeight {
            regime: regime.to_string(),
            strategy: strategy.to_string(),
            weight,
        })
    }
}
