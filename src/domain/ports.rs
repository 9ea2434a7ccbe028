use crate::domain::market::feature_vector::FeatureHistory;
use crate::domain::market::interval::Interval;
use anyhow::Result;
use async_trait::async_trait;

/// Data-ingestion collaborator: supplies indicator history per (symbol, interval).
///
/// An empty history means "no data"; an `Err` means the source itself failed.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    async fn load_history(&self, symbol: &str, interval: Interval) -> Result<FeatureHistory>;
}
