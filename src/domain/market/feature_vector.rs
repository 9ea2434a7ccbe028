use crate::domain::ml::feature_registry::{ALL_FEATURES, Feature};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Indicator snapshot for one period.
///
/// Every field of the training-time feature set is present; a value the ingestion
/// side could not compute (warm-up period, bad tick) is `None`. Non-finite numbers
/// never make it in: `set` and `with` store them as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub timestamp: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub ma_10: Option<f64>,
    pub ma_50: Option<f64>,
    pub ma_200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub signal_line: Option<f64>,
    pub bb_upper: Option<f64>,
    pub bb_lower: Option<f64>,
    pub volatility: Option<f64>,
}

impl FeatureVector {
    /// Empty snapshot: every feature explicitly null.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            ma_10: None,
            ma_50: None,
            ma_200: None,
            rsi: None,
            macd: None,
            signal_line: None,
            bb_upper: None,
            bb_lower: None,
            volatility: None,
        }
    }

    pub fn with(mut self, feature: Feature, value: f64) -> Self {
        self.set(feature, Some(value));
        self
    }

    pub fn set(&mut self, feature: Feature, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        *self.slot_mut(feature) = value;
    }

    pub fn get(&self, feature: Feature) -> Option<f64> {
        match feature {
            Feature::Open => self.open,
            Feature::High => self.high,
            Feature::Low => self.low,
            Feature::Close => self.close,
            Feature::Volume => self.volume,
            Feature::Ma10 => self.ma_10,
            Feature::Ma50 => self.ma_50,
            Feature::Ma200 => self.ma_200,
            Feature::Rsi => self.rsi,
            Feature::Macd => self.macd,
            Feature::SignalLine => self.signal_line,
            Feature::BbUpper => self.bb_upper,
            Feature::BbLower => self.bb_lower,
            Feature::Volatility => self.volatility,
        }
    }

    fn slot_mut(&mut self, feature: Feature) -> &mut Option<f64> {
        match feature {
            Feature::Open => &mut self.open,
            Feature::High => &mut self.high,
            Feature::Low => &mut self.low,
            Feature::Close => &mut self.close,
            Feature::Volume => &mut self.volume,
            Feature::Ma10 => &mut self.ma_10,
            Feature::Ma50 => &mut self.ma_50,
            Feature::Ma200 => &mut self.ma_200,
            Feature::Rsi => &mut self.rsi,
            Feature::Macd => &mut self.macd,
            Feature::SignalLine => &mut self.signal_line,
            Feature::BbUpper => &mut self.bb_upper,
            Feature::BbLower => &mut self.bb_lower,
            Feature::Volatility => &mut self.volatility,
        }
    }

    /// Ordered (name, value) view following `FEATURE_NAMES`.
    pub fn entries(&self) -> impl Iterator<Item = (Feature, Option<f64>)> + '_ {
        ALL_FEATURES.iter().map(move |f| (*f, self.get(*f)))
    }

    /// Values for `features`, or the first missing feature.
    pub fn select(&self, features: &[Feature]) -> Result<Vec<f64>, Feature> {
        features
            .iter()
            .map(|f| self.get(*f).ok_or(*f))
            .collect()
    }

    pub fn has_all(&self, features: &[Feature]) -> bool {
        features.iter().all(|f| self.get(*f).is_some())
    }
}

/// Time-ordered indicator snapshots for one (symbol, interval) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureHistory {
    rows: Vec<FeatureVector>,
}

impl FeatureHistory {
    /// Rows are sorted by timestamp; the sort is stable so equal timestamps keep
    /// their ingestion order.
    pub fn new(mut rows: Vec<FeatureVector>) -> Self {
        rows.sort_by_key(|r| r.timestamp);
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn latest(&self) -> Option<&FeatureVector> {
        self.rows.last()
    }

    /// The trailing `n` rows (or all of them when shorter).
    pub fn tail(&self, n: usize) -> &[FeatureVector] {
        &self.rows[self.rows.len().saturating_sub(n)..]
    }

    pub fn column(&self, feature: Feature) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.get(feature)).collect()
    }

    /// Closing prices, skipping periods without one.
    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.close).collect()
    }
}
