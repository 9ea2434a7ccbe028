use crate::domain::forecast::FailureReason;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors a forecast request can surface to its caller.
///
/// Per-strategy failures and a missing regime never show up here; they are recorded
/// as data on the forecast. `InsufficientModels` is the one computed-but-unusable
/// outcome and is a health problem, not an empty state.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("No feature history for {symbol} at {interval}")]
    NoData { symbol: String, interval: String },

    #[error("Current price is not usable: {price}")]
    InvalidCurrentPrice { price: f64 },

    #[error("No strategy produced a prediction ({attempted} attempted)")]
    InsufficientModels {
        attempted: usize,
        failures: BTreeMap<String, FailureReason>,
    },

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl ForecastError {
    /// True when the failure indicates broken models rather than missing data.
    pub fn is_health_problem(&self) -> bool {
        matches!(self, ForecastError::InsufficientModels { .. })
    }
}

/// Errors from the clustering step; the detector turns these into a null regime.
#[derive(Debug, Error, PartialEq)]
pub enum RegimeError {
    #[error("Need at least {clusters} distinct observations, got {distinct}")]
    Degenerate { distinct: usize, clusters: usize },

    #[error("Invalid observation matrix: {reason}")]
    InvalidInput { reason: String },
}

/// Errors loading a regime weight table
#[derive(Debug, Error)]
pub enum WeightTableError {
    #[error("Failed to read weight table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse weight table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid regime id '{0}': must be a non-negative integer")]
    InvalidRegime(String),

    #[error("Invalid weight for {strategy} in regime {regime}: {weight}")]
    InvalidWeight {
        regime: String,
        strategy: String,
        weight: f64,
    },
}
