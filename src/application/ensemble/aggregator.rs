use super::outliers::{largest_cluster_mask, sigma_mask};
use super::weights::RegimeWeightTable;
use crate::domain::errors::ForecastError;
use crate::domain::forecast::{
    Direction, EnsembleForecast, EnsembleMethod, FailureReason, ModelReport, StrategyResult,
    StrategyResults, format_change_pct,
};
use crate::domain::market::market_regime::RegimeAssignment;
use std::collections::BTreeMap;
use tracing::debug;

/// Seed of the 1-D prediction clustering
const OUTLIER_SEED: u64 = 42;

struct Weighting {
    method: EnsembleMethod,
    weights: BTreeMap<String, f64>,
    excluded: Vec<String>,
}

/// Fan-in step: combines successful strategy outputs into one consensus forecast.
///
/// A pure function of its inputs plus the configured method and weight table.
#[derive(Debug, Clone)]
pub struct EnsembleAggregator {
    method: EnsembleMethod,
    weights: Option<RegimeWeightTable>,
}

impl EnsembleAggregator {
    pub fn new(method: EnsembleMethod) -> Self {
        Self {
            method,
            weights: None,
        }
    }

    pub fn with_weights(mut self, weights: RegimeWeightTable) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn method(&self) -> EnsembleMethod {
        self.method
    }

    pub fn aggregate(
        &self,
        results: &StrategyResults,
        regime: &RegimeAssignment,
        current_price: f64,
    ) -> Result<EnsembleForecast, ForecastError> {
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(ForecastError::InvalidCurrentPrice {
                price: current_price,
            });
        }

        let failed_strategies: BTreeMap<String, FailureReason> = results
            .failures()
            .map(|(name, reason)| (name.to_string(), reason.clone()))
            .collect();
        let successes: Vec<(&str, f64)> = results.successes().collect();
        if successes.is_empty() {
            return Err(ForecastError::InsufficientModels {
                attempted: results.len(),
                failures: failed_strategies,
            });
        }

        let weighting = self.weigh(&successes, regime.cluster_regime);
        let mass: f64 = weighting.weights.values().sum();
        let predicted_next_close = successes
            .iter()
            .map(|(name, price)| weighting.weights.get(*name).copied().unwrap_or(0.0) * price)
            .sum::<f64>()
            / mass;

        let models = results
            .headline
            .iter()
            .map(|name| {
                let report = match results.results.get(name) {
                    Some(StrategyResult::Success { predicted_price }) => {
                        ModelReport::Price(*predicted_price)
                    }
                    _ => ModelReport::Failed,
                };
                (name.clone(), report)
            })
            .collect();

        let change_pct = (predicted_next_close - current_price) / current_price * 100.0;
        debug!(
            "Aggregated {} predictions with {}: {:.4} ({} excluded)",
            successes.len(),
            weighting.method,
            predicted_next_close,
            weighting.excluded.len()
        );

        Ok(EnsembleForecast {
            current_price,
            predicted_next_close,
            direction: Direction::from_prices(predicted_next_close, current_price),
            expected_change_pct: format_change_pct(change_pct),
            models,
            raw_predictions: successes
                .iter()
                .map(|(name, price)| (name.to_string(), *price))
                .collect(),
            num_strategies: successes.len(),
            cluster_regime: regime.cluster_regime,
            ensemble_method: weighting.method,
            weights: weighting.weights,
            excluded_outliers: weighting.excluded,
            failed_strategies,
        })
    }

    fn weigh(&self, successes: &[(&str, f64)], regime: Option<usize>) -> Weighting {
        let names: Vec<&str> = successes.iter().map(|(n, _)| *n).collect();
        let values: Vec<f64> = successes.iter().map(|(_, p)| *p).collect();

        match self.method {
            EnsembleMethod::EqualWeight | EnsembleMethod::EqualWeightFallback => {
                equal(&names, &vec![true; names.len()], self.method)
            }
            EnsembleMethod::RegimeWeighted => {
                let table_weights = regime.zip(self.weights.as_ref()).and_then(|(id, table)| {
                    table.weights_for(id, &names)
                });
                match table_weights {
                    Some(weights) => Weighting {
                        method: EnsembleMethod::RegimeWeighted,
                        weights,
                        excluded: Vec::new(),
                    },
                    None => {
                        debug!("Regime weights unavailable for regime {:?}, using equal weight", regime);
                        equal(&names, &vec![true; names.len()], EnsembleMethod::EqualWeightFallback)
                    }
                }
            }
            EnsembleMethod::Median => median(&names, &values),
            EnsembleMethod::TrimmedMean => equal(&names, &sigma_mask(&values), self.method),
            EnsembleMethod::ClusteredTrimmedMean => {
                let cluster = largest_cluster_mask(&values, OUTLIER_SEED);
                let kept: Vec<f64> = values
                    .iter()
                    .zip(&cluster)
                    .filter(|(_, keep)| **keep)
                    .map(|(v, _)| *v)
                    .collect();
                let mut trimmed = sigma_mask(&kept).into_iter();
                let mask: Vec<bool> = cluster
                    .iter()
                    .map(|in_cluster| *in_cluster && trimmed.next().unwrap_or(true))
                    .collect();
                equal(&names, &mask, self.method)
            }
        }
    }
}

/// Equal weights over the kept entries, zero for the rest.
fn equal(names: &[&str], keep: &[bool], method: EnsembleMethod) -> Weighting {
    let kept = keep.iter().filter(|k| **k).count().max(1) as f64;
    let mut weights = BTreeMap::new();
    let mut excluded = Vec::new();
    for (name, keep) in names.iter().zip(keep) {
        if *keep {
            weights.insert(name.to_string(), 1.0 / kept);
        } else {
            weights.insert(name.to_string(), 0.0);
            excluded.push(name.to_string());
        }
    }
    Weighting {
        method,
        weights,
        excluded,
    }
}

/// The median as a weighting: the middle value, or the two middle values at 0.5.
fn median(names: &[&str], values: &[f64]) -> Weighting {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|a, b| values[*a].total_cmp(&values[*b]).then(names[*a].cmp(names[*b])));

    let n = order.len();
    let middle: Vec<usize> = if n % 2 == 1 {
        vec![order[n / 2]]
    } else {
        vec![order[n / 2 - 1], order[n / 2]]
    };
    let share = 1.0 / middle.len() as f64;

    let weights = names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let w = if middle.contains(&i) { share } else { 0.0 };
            (name.to_string(), w)
        })
        .collect();
    Weighting {
        method: EnsembleMethod::Median,
        weights,
        excluded: Vec::new(),
    }
}
