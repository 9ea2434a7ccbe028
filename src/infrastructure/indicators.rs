//! Per-period indicator snapshots computed from raw OHLCV bars with the `ta` crate.
//!
//! Values inside an indicator's warm-up period are left null rather than reported
//! from a partially filled window.

use crate::domain::market::bar::Bar;
use crate::domain::market::feature_vector::{FeatureHistory, FeatureVector};
use crate::domain::ml::feature_registry::Feature;
use anyhow::Result;
use ta::Next;
use ta::indicators::{
    BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex,
    SimpleMovingAverage, StandardDeviation,
};

pub const MA_FAST: usize = 10;
pub const MA_MID: usize = 50;
pub const MA_SLOW: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_STD_DEV: f64 = 2.0;
pub const VOLATILITY_PERIOD: usize = 20;

fn ta_error(e: ta::errors::TaError) -> anyhow::Error {
    anyhow::anyhow!("Invalid indicator parameter: {:?}", e)
}

/// Streaming indicator state; feed bars oldest first.
pub struct IndicatorEngine {
    sma_fast: SimpleMovingAverage,
    sma_mid: SimpleMovingAverage,
    sma_slow: SimpleMovingAverage,
    rsi: RelativeStrengthIndex,
    macd: MovingAverageConvergenceDivergence,
    bb: BollingerBands,
    volatility: StandardDeviation,
    bars_seen: usize,
    changes_seen: usize,
    prev: Option<Bar>,
}

impl IndicatorEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sma_fast: SimpleMovingAverage::new(MA_FAST).map_err(ta_error)?,
            sma_mid: SimpleMovingAverage::new(MA_MID).map_err(ta_error)?,
            sma_slow: SimpleMovingAverage::new(MA_SLOW).map_err(ta_error)?,
            rsi: RelativeStrengthIndex::new(RSI_PERIOD).map_err(ta_error)?,
            macd: MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL)
                .map_err(ta_error)?,
            bb: BollingerBands::new(BB_PERIOD, BB_STD_DEV).map_err(ta_error)?,
            volatility: StandardDeviation::new(VOLATILITY_PERIOD).map_err(ta_error)?,
            bars_seen: 0,
            changes_seen: 0,
            prev: None,
        })
    }

    pub fn next(&mut self, bar: &Bar) -> FeatureVector {
        self.bars_seen += 1;
        let seen = self.bars_seen;
        let ready = |period: usize, value: f64| (seen >= period).then_some(value);

        let close = bar.close;
        let sma_fast = self.sma_fast.next(close);
        let sma_mid = self.sma_mid.next(close);
        let sma_slow = self.sma_slow.next(close);
        let rsi = self.rsi.next(close);
        let macd = self.macd.next(close);
        let bb = self.bb.next(close);

        let volatility = match self.prev.as_ref().and_then(|p| bar.pct_change_from(p)) {
            Some(change) => {
                self.changes_seen += 1;
                let std = self.volatility.next(change);
                (self.changes_seen >= VOLATILITY_PERIOD).then_some(std)
            }
            None => None,
        };
        self.prev = Some(bar.clone());

        let mut features = FeatureVector::new(bar.timestamp)
            .with(Feature::Open, bar.open)
            .with(Feature::High, bar.high)
            .with(Feature::Low, bar.low)
            .with(Feature::Close, close)
            .with(Feature::Volume, bar.volume);
        features.set(Feature::Ma10, ready(MA_FAST, sma_fast));
        features.set(Feature::Ma50, ready(MA_MID, sma_mid));
        features.set(Feature::Ma200, ready(MA_SLOW, sma_slow));
        features.set(Feature::Rsi, ready(RSI_PERIOD + 1, rsi));
        features.set(Feature::Macd, ready(MACD_SLOW, macd.macd));
        features.set(Feature::SignalLine, ready(MACD_SLOW + MACD_SIGNAL - 1, macd.signal));
        features.set(Feature::BbUpper, ready(BB_PERIOD, bb.upper));
        features.set(Feature::BbLower, ready(BB_PERIOD, bb.lower));
        features.set(Feature::Volatility, volatility);
        features
    }
}

/// Indicator history for `bars`, which must already be in time order.
pub fn compute_features(bars: &[Bar]) -> Result<FeatureHistory> {
    let mut engine = IndicatorEngine::new()?;
    Ok(FeatureHistory::new(bars.iter().map(|b| engine.next(b)).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn bars(n: usize) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let close = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.1;
                Bar::new(start + Duration::days(i as i64), close, close + 1.0, close - 1.0, close, 1e6)
            })
            .collect()
    }

    #[test]
    fn test_warm_up_values_are_null() {
        let history = compute_features(&bars(250)).unwrap();
        let rows = history.rows();

        assert!(rows[8].ma_10.is_none());
        assert!(rows[9].ma_10.is_some());
        assert!(rows[13].rsi.is_none());
        assert!(rows[14].rsi.is_some());
        assert!(rows[19].volatility.is_none());
        assert!(rows[20].volatility.is_some());
        assert!(rows[198].ma_200.is_none());
        assert!(rows[199].ma_200.is_some());
        assert!(rows[32].signal_line.is_none());
        assert!(rows[33].signal_line.is_some());
    }

    #[test]
    fn test_moving_average_matches_window_mean() {
        let input = bars(60);
        let history = compute_features(&input).unwrap();
        let expected: f64 = input[50..60].iter().map(|b| b.close).sum::<f64>() / 10.0;
        let got = history.rows()[59].ma_10.unwrap();
        assert!((got - expected).abs() < 1e-9);
    }

    #[test]
    fn test_bands_bracket_the_average() {
        let history = compute_features(&bars(80)).unwrap();
        let latest = history.latest().unwrap();
        assert!(latest.bb_upper.unwrap() > latest.bb_lower.unwrap());
        assert!(latest.volatility.unwrap() > 0.0);
    }
}
