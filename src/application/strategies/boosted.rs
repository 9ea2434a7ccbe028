use super::training::{TrainingSet, single_prediction};
use super::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::{FailureReason, StrategyRole};
use crate::domain::ml::feature_registry::{Feature, TRAINING_FEATURES};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 2,
        }
    }
}

/// Gradient-boosted regression trees (squared loss).
///
/// Each round fits a shallow tree to the current residuals and adds a shrunken copy
/// of it to the ensemble. The cancel flag is polled between rounds. The headline
/// `XGBoost` entry uses depth-3 trees; the auxiliary `LGBM` entry grows deeper
/// trees with larger leaves.
#[derive(Debug, Clone)]
pub struct GradientBoostingStrategy {
    name: &'static str,
    role: StrategyRole,
    config: BoostingConfig,
}

impl GradientBoostingStrategy {
    pub const NAME: &'static str = "XGBoost";
    pub const LGBM_NAME: &'static str = "LGBM";

    pub fn new(config: BoostingConfig) -> Self {
        Self {
            name: Self::NAME,
            role: StrategyRole::Headline,
            config,
        }
    }

    /// Auxiliary booster: 50 rounds at learning rate 0.1, depth 5, 20 rows per leaf.
    pub fn lgbm() -> Self {
        Self {
            name: Self::LGBM_NAME,
            role: StrategyRole::Auxiliary,
            config: BoostingConfig {
                n_estimators: 50,
                learning_rate: 0.1,
                max_depth: 5,
                min_samples_leaf: 20,
            },
        }
    }

    fn boost(
        &self,
        ctx: &StrategyContext,
        x: &DenseMatrix<f64>,
        y: &[f64],
        last: &DenseMatrix<f64>,
    ) -> Result<f64, FailureReason> {
        let base = y.iter().sum::<f64>() / y.len() as f64;
        let mut fitted = vec![base; y.len()];
        let mut prediction = base;

        let params = DecisionTreeRegressorParameters::default()
            .with_max_depth(self.config.max_depth)
            .with_min_samples_leaf(self.config.min_samples_leaf);

        for round in 0..self.config.n_estimators {
            ctx.cancel.check()?;

            let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(t, f)| t - f).collect();
            let tree: DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>> =
                DecisionTreeRegressor::fit(x, &residuals, params.clone()).map_err(|e| {
                    debug!("Boosting round {} failed: {}", round, e);
                    FailureReason::FitFailed
                })?;

            let step = tree.predict(x).map_err(|_| FailureReason::FitFailed)?;
            for (f, s) in fitted.iter_mut().zip(&step) {
                *f += self.config.learning_rate * s;
            }

            let last_step =
                single_prediction(tree.predict(last).map_err(|_| FailureReason::FitFailed)?)?;
            prediction += self.config.learning_rate * last_step;
        }

        Ok(prediction)
    }
}

impl Default for GradientBoostingStrategy {
    fn default() -> Self {
        Self::new(BoostingConfig::default())
    }
}

impl PriceStrategy for GradientBoostingStrategy {
    fn name(&self) -> &str {
        self.name
    }

    fn role(&self) -> StrategyRole {
        self.role
    }

    fn required_features(&self) -> &[Feature] {
        TRAINING_FEATURES
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let set = TrainingSet::prepare(ctx, TRAINING_FEATURES)?;
        let x = set.x_matrix()?;
        let last = set.last_matrix()?;
        self.boost(ctx, &x, &set.y, &last)
    }
}
