use super::training::{TrainingSet, single_prediction, to_matrix};
use super::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::FailureReason;
use crate::domain::ml::feature_registry::{Feature, TRAINING_FEATURES};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::metrics::distance::euclidian::Euclidian;
use smartcore::neighbors::knn_regressor::{KNNRegressor, KNNRegressorParameters};
use tracing::debug;

/// k-nearest-neighbour regression over standardized training features.
#[derive(Debug, Clone)]
pub struct NearestNeighborsStrategy {
    k: usize,
}

impl NearestNeighborsStrategy {
    pub fn new(k: usize) -> Self {
        Self { k: k.max(1) }
    }
}

impl Default for NearestNeighborsStrategy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PriceStrategy for NearestNeighborsStrategy {
    fn name(&self) -> &str {
        "KNN"
    }

    fn required_features(&self) -> &[Feature] {
        TRAINING_FEATURES
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let set = TrainingSet::prepare(ctx, TRAINING_FEATURES)?.standardized();
        if set.len() < self.k {
            return Err(FailureReason::InsufficientHistory);
        }
        let x = to_matrix(&set.x)?;
        let model: KNNRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>, Euclidian<f64>> =
            KNNRegressor::fit(&x, &set.y, KNNRegressorParameters::default().with_k(self.k))
                .map_err(|e| {
                    debug!("KNN fit failed: {}", e);
                    FailureReason::FitFailed
                })?;
        let predictions = model
            .predict(&set.last_matrix()?)
            .map_err(|_| FailureReason::FitFailed)?;
        single_prediction(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::synthetic_history;
    use std::sync::Arc;

    #[test]
    fn test_knn_prediction_is_a_neighbour_average() {
        let history = synthetic_history(300, 5);
        let latest = history.latest().cloned().unwrap();
        let ctx = StrategyContext::new(Arc::new(latest), Arc::new(history));
        let p = NearestNeighborsStrategy::default().predict(&ctx).unwrap();
        let closes = ctx.history.closes();
        let min = closes.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = closes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert!(p >= min && p <= max);
    }
}
