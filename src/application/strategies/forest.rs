use super::training::{TrainingSet, single_prediction};
use super::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::FailureReason;
use crate::domain::ml::feature_registry::{Feature, TRAINING_FEATURES};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

/// Random forest on the training features. The seed is fixed so repeated requests
/// over the same history agree.
#[derive(Debug, Clone)]
pub struct RandomForestStrategy {
    n_trees: usize,
    max_depth: u16,
    seed: u64,
}

impl RandomForestStrategy {
    pub fn new(n_trees: usize, max_depth: u16, seed: u64) -> Self {
        Self {
            n_trees,
            max_depth,
            seed,
        }
    }
}

impl Default for RandomForestStrategy {
    fn default() -> Self {
        Self::new(50, 5, 42)
    }
}

impl PriceStrategy for RandomForestStrategy {
    fn name(&self) -> &str {
        "RandomForest"
    }

    fn required_features(&self) -> &[Feature] {
        TRAINING_FEATURES
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let set = TrainingSet::prepare(ctx, TRAINING_FEATURES)?;
        ctx.cancel.check()?;
        let x = set.x_matrix()?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(self.n_trees)
            .with_max_depth(self.max_depth)
            .with_seed(self.seed);
        let model: RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>> =
            RandomForestRegressor::fit(&x, &set.y, params).map_err(|e| {
                debug!("RandomForest fit failed: {}", e);
                FailureReason::FitFailed
            })?;
        let predictions = model
            .predict(&set.last_matrix()?)
            .map_err(|_| FailureReason::FitFailed)?;
        single_prediction(predictions)
    }
}
