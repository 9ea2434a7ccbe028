use crate::domain::market::bar::Bar;
use crate::domain::market::feature_vector::FeatureHistory;
use crate::domain::market::interval::Interval;
use crate::domain::ports::FeatureSource;
use crate::infrastructure::indicators::compute_features;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Feature source holding histories in memory, keyed by upper-cased symbol and interval.
#[derive(Clone, Default)]
pub struct InMemoryFeatureSource {
    histories: Arc<RwLock<HashMap<(String, Interval), FeatureHistory>>>,
}

impl InMemoryFeatureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, symbol: &str, interval: Interval, history: FeatureHistory) {
        self.histories
            .write()
            .await
            .insert((symbol.trim().to_uppercase(), interval), history);
    }

    /// Source pre-filled with a deterministic random walk for `symbol`.
    pub async fn with_synthetic(symbol: &str, interval: Interval, periods: usize, seed: u64) -> Self {
        let source = Self::new();
        source
            .insert(symbol, interval, synthetic_history(periods, seed))
            .await;
        info!(
            "Synthetic source ready: {} {} ({} periods, seed {})",
            symbol, interval, periods, seed
        );
        source
    }
}

#[async_trait]
impl FeatureSource for InMemoryFeatureSource {
    async fn load_history(&self, symbol: &str, interval: Interval) -> Result<FeatureHistory> {
        Ok(self
            .histories
            .read()
            .await
            .get(&(symbol.trim().to_uppercase(), interval))
            .cloned()
            .unwrap_or_default())
    }
}

/// Daily OHLCV random walk starting at 100, reproducible for a given seed.
pub fn synthetic_bars(periods: usize, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = Utc
        .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default();

    let mut close = 100.0_f64;
    (0..periods)
        .map(|i| {
            let open = close;
            close = (open * (1.0 + 0.0003 + rng.random_range(-0.015..0.015))).max(1.0);
            let high = open.max(close) * (1.0 + rng.random_range(0.0..0.005));
            let low = open.min(close) * (1.0 - rng.random_range(0.0..0.005));
            let volume = 1.0e6 * (1.0 + rng.random_range(0.0..0.5));
            Bar::new(start + Duration::days(i as i64), open, high, low, close, volume)
        })
        .collect()
}

/// Indicator history of `synthetic_bars(periods, seed)`.
pub fn synthetic_history(periods: usize, seed: u64) -> FeatureHistory {
    // The indicator periods are constants, so construction cannot fail.
    compute_features(&synthetic_bars(periods, seed)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_history_is_reproducible() {
        assert_eq!(synthetic_history(250, 9), synthetic_history(250, 9));
        assert_ne!(synthetic_history(250, 9), synthetic_history(250, 10));
    }

    #[test]
    fn test_synthetic_bars_are_valid() {
        let bars = synthetic_bars(400, 1);
        assert_eq!(bars.len(), 400);
        assert!(bars.iter().all(Bar::is_valid));
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let source = InMemoryFeatureSource::with_synthetic("aapl", Interval::OneDay, 60, 3).await;
        let history = source.load_history("AAPL", Interval::OneDay).await.unwrap();
        assert_eq!(history.len(), 60);
        assert!(source.load_history("AAPL", Interval::OneHour).await.unwrap().is_empty());
    }

    #[test]
    fn test_insert_replaces_history() {
        let source = InMemoryFeatureSource::new();
        tokio_test::block_on(async {
            source.insert("msft", Interval::OneDay, synthetic_history(30, 1)).await;
            source.insert("MSFT", Interval::OneDay, synthetic_history(10, 1)).await;
            let history = source.load_history("msft", Interval::OneDay).await.unwrap();
            assert_eq!(history.len(), 10);
        });
    }
}
