use crate::domain::forecast::{
    Direction, EnsembleForecast, EnsembleMethod, FailureReason, ModelReport,
};
use crate::domain::market::interval::Interval;
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-model transparency block of a forecast response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastDetails {
    pub models: BTreeMap<String, ModelReport>,
    pub raw_predictions: BTreeMap<String, f64>,
    pub num_strategies: usize,
    pub cluster_regime: Option<usize>,
    pub ensemble_method: EnsembleMethod,
    pub weights: BTreeMap<String, f64>,
    pub excluded_outliers: Vec<String>,
    pub failed_strategies: BTreeMap<String, FailureReason>,
}

/// Response handed to the presentation layer. Non-finite numbers serialize as null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub symbol: String,
    pub interval: Interval,
    pub current_price: Option<f64>,
    pub predicted_next_close: Option<f64>,
    pub direction: Direction,
    pub expected_change_pct: String,
    pub details: ForecastDetails,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Attach request context to a computed forecast.
pub fn assemble(forecast: EnsembleForecast, symbol: &str, interval: Interval) -> ForecastResponse {
    let models = forecast
        .models
        .into_iter()
        .map(|(name, report)| {
            let report = match report {
                ModelReport::Price(p) if p.is_finite() => ModelReport::Price(p),
                _ => ModelReport::Failed,
            };
            (name, report)
        })
        .collect();

    ForecastResponse {
        symbol: symbol.trim().to_uppercase(),
        interval,
        current_price: finite(forecast.current_price),
        predicted_next_close: finite(forecast.predicted_next_close),
        direction: forecast.direction,
        expected_change_pct: forecast.expected_change_pct,
        details: ForecastDetails {
            models,
            raw_predictions: forecast
                .raw_predictions
                .into_iter()
                .filter(|(_, p)| p.is_finite())
                .collect(),
            num_strategies: forecast.num_strategies,
            cluster_regime: forecast.cluster_regime,
            ensemble_method: forecast.ensemble_method,
            weights: forecast.weights,
            excluded_outliers: forecast.excluded_outliers,
            failed_strategies: forecast.failed_strategies,
        },
    }
}
