use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Machine-readable reason a single strategy produced no usable price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    InsufficientFeatures,
    InsufficientHistory,
    NonFiniteOutput,
    Timeout,
    DeadlineExceeded,
    Panicked,
    Cancelled,
    ModelNotLoaded,
    ModelLoading,
    ModelLoadFailed,
    FitFailed,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::InsufficientFeatures => "insufficient_features",
            FailureReason::InsufficientHistory => "insufficient_history",
            FailureReason::NonFiniteOutput => "non_finite_output",
            FailureReason::Timeout => "timeout",
            FailureReason::DeadlineExceeded => "deadline_exceeded",
            FailureReason::Panicked => "panicked",
            FailureReason::Cancelled => "cancelled",
            FailureReason::ModelNotLoaded => "model_not_loaded",
            FailureReason::ModelLoading => "model_loading",
            FailureReason::ModelLoadFailed => "model_load_failed",
            FailureReason::FitFailed => "fit_failed",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one strategy for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyResult {
    Success { predicted_price: f64 },
    Failure { reason: FailureReason },
}

impl StrategyResult {
    /// A non-finite price is a failure, never a success.
    pub fn from_prediction(prediction: Result<f64, FailureReason>) -> Self {
        match prediction {
            Ok(price) if price.is_finite() => StrategyResult::Success {
                predicted_price: price,
            },
            Ok(_) => StrategyResult::Failure {
                reason: FailureReason::NonFiniteOutput,
            },
            Err(reason) => StrategyResult::Failure { reason },
        }
    }

    pub fn failure(reason: FailureReason) -> Self {
        StrategyResult::Failure { reason }
    }

    pub fn price(&self) -> Option<f64> {
        match self {
            StrategyResult::Success { predicted_price } => Some(*predicted_price),
            StrategyResult::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.price().is_some()
    }
}

/// Whether a strategy is always reported by name or only in the raw predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyRole {
    Headline,
    Auxiliary,
}

/// Named strategy outcomes of one request, keyed by strategy name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyResults {
    pub results: BTreeMap<String, StrategyResult>,
    /// Headline strategy names, in registration order.
    pub headline: Vec<String>,
}

impl StrategyResults {
    pub fn successes(&self) -> impl Iterator<Item = (&str, f64)> {
        self.results
            .iter()
            .filter_map(|(name, r)| r.price().map(|p| (name.as_str(), p)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &FailureReason)> {
        self.results.iter().filter_map(|(name, r)| match r {
            StrategyResult::Failure { reason } => Some((name.as_str(), reason)),
            StrategyResult::Success { .. } => None,
        })
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
}

impl Direction {
    /// Equality resolves to `Up`.
    pub fn from_prices(predicted: f64, current: f64) -> Self {
        if predicted >= current {
            Direction::Up
        } else {
            Direction::Down
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// Weighting scheme used to combine strategy outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnsembleMethod {
    EqualWeight,
    RegimeWeighted,
    Median,
    TrimmedMean,
    ClusteredTrimmedMean,
    /// Reported when regime weighting was requested but could not apply
    EqualWeightFallback,
}

impl EnsembleMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnsembleMethod::EqualWeight => "equal_weight",
            EnsembleMethod::RegimeWeighted => "regime_weighted",
            EnsembleMethod::Median => "median",
            EnsembleMethod::TrimmedMean => "trimmed_mean",
            EnsembleMethod::ClusteredTrimmedMean => "clustered_trimmed_mean",
            EnsembleMethod::EqualWeightFallback => "equal_weight_fallback",
        }
    }
}

impl fmt::Display for EnsembleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnsembleMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal_weight" | "mean" => Ok(EnsembleMethod::EqualWeight),
            "regime_weighted" => Ok(EnsembleMethod::RegimeWeighted),
            "median" => Ok(EnsembleMethod::Median),
            "trimmed_mean" | "trimmed" => Ok(EnsembleMethod::TrimmedMean),
            "clustered_trimmed_mean" => Ok(EnsembleMethod::ClusteredTrimmedMean),
            _ => anyhow::bail!(
                "Invalid ENSEMBLE_METHOD: {}. Must be 'equal_weight', 'regime_weighted', 'median', 'trimmed_mean' or 'clustered_trimmed_mean'",
                s
            ),
        }
    }
}

/// Headline model entry: a price, or the failure sentinel `"Failed"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModelReport {
    Price(f64),
    Failed,
}

pub const FAILURE_SENTINEL: &str = "Failed";

impl Serialize for ModelReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ModelReport::Price(p) => serializer.serialize_f64(*p),
            ModelReport::Failed => serializer.serialize_str(FAILURE_SENTINEL),
        }
    }
}

/// Consensus forecast plus per-strategy transparency.
///
/// `num_strategies` always equals `raw_predictions.len()`, and `direction` is derived
/// from `predicted_next_close - current_price`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleForecast {
    pub current_price: f64,
    pub predicted_next_close: f64,
    pub direction: Direction,
    pub expected_change_pct: String,
    pub models: BTreeMap<String, ModelReport>,
    pub raw_predictions: BTreeMap<String, f64>,
    pub num_strategies: usize,
    pub cluster_regime: Option<usize>,
    pub ensemble_method: EnsembleMethod,
    /// Renormalized weight applied to every successful strategy
    pub weights: BTreeMap<String, f64>,
    pub excluded_outliers: Vec<String>,
    pub failed_strategies: BTreeMap<String, FailureReason>,
}

/// Signed percentage with two decimals, e.g. `+0.33%` or `-1.20%`.
pub fn format_change_pct(pct: f64) -> String {
    // -0.0 would render as "-0.00%"
    let pct = if pct == 0.0 { 0.0 } else { pct };
    format!("{:+.2}%", pct)
}
