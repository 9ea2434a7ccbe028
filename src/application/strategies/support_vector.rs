use super::training::{TrainingSet, single_prediction, to_matrix};
use super::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::FailureReason;
use crate::domain::ml::feature_registry::{Feature, TRAINING_FEATURES};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::svm::Kernels;
use smartcore::svm::svr::{SVR, SVRParameters};
use tracing::debug;

/// Epsilon-SVR with an RBF kernel over standardized training features.
///
/// Gamma is `1 / n_features`, the usual "scale" choice once columns have unit
/// variance.
#[derive(Debug, Clone)]
pub struct SupportVectorStrategy {
    c: f64,
    epsilon: f64,
}

impl SupportVectorStrategy {
    pub fn new(c: f64, epsilon: f64) -> Self {
        Self { c, epsilon }
    }
}

impl Default for SupportVectorStrategy {
    fn default() -> Self {
        Self::new(100.0, 0.1)
    }
}

impl PriceStrategy for SupportVectorStrategy {
    fn name(&self) -> &str {
        "SVR"
    }

    fn required_features(&self) -> &[Feature] {
        TRAINING_FEATURES
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let set = TrainingSet::prepare(ctx, TRAINING_FEATURES)?.standardized();
        ctx.cancel.check()?;

        let x = to_matrix(&set.x)?;
        let last = set.last_matrix()?;
        let gamma = 1.0 / set.last.len().max(1) as f64;
        let params = SVRParameters::default()
            .with_c(self.c)
            .with_eps(self.epsilon)
            .with_kernel(Kernels::rbf().with_gamma(gamma));
        let model: SVR<f64, DenseMatrix<f64>, Vec<f64>> = SVR::fit(&x, &set.y, &params)
            .map_err(|e| {
                debug!("SVR fit failed: {}", e);
                FailureReason::FitFailed
            })?;

        let predictions = model.predict(&last).map_err(|_| FailureReason::FitFailed)?;
        single_prediction(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::synthetic_history;
    use std::sync::Arc;

    #[test]
    fn test_svr_is_deterministic() {
        let history = synthetic_history(300, 4);
        let latest = history.latest().cloned().unwrap();
        let ctx = StrategyContext::new(Arc::new(latest), Arc::new(history));
        let s = SupportVectorStrategy::default();

        let a = s.predict(&ctx).unwrap();
        assert_eq!(a, s.predict(&ctx).unwrap());
        let close = ctx.features.close.unwrap();
        assert!((a - close).abs() / close < 0.2, "predicted {} vs {}", a, close);
    }

    #[test]
    fn test_short_history_is_rejected() {
        let history = synthetic_history(210, 4);
        let latest = history.latest().cloned().unwrap();
        let ctx = StrategyContext::new(Arc::new(latest), Arc::new(history));
        assert_eq!(
            SupportVectorStrategy::default().predict(&ctx).unwrap_err(),
            FailureReason::InsufficientHistory
        );
    }
}
