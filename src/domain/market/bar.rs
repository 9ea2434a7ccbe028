use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV period, as supplied by the data-ingestion side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Finite prices with `low <= open, close <= high` and non-negative volume.
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite())
            && self.low <= self.high
            && (self.low..=self.high).contains(&self.open)
            && (self.low..=self.high).contains(&self.close)
            && self.volume >= 0.0
    }

    /// Close-to-close relative change from `previous`
    pub fn pct_change_from(&self, previous: &Bar) -> Option<f64> {
        (previous.close != 0.0).then(|| self.close / previous.close - 1.0)
    }
}
