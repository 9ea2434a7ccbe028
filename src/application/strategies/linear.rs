use super::training::{TrainingSet, single_prediction};
use super::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::{FailureReason, StrategyRole};
use crate::domain::ml::feature_registry::{Feature, TRAINING_FEATURES};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::lasso::{Lasso, LassoParameters};
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};
use smartcore::linear::ridge_regression::{RidgeRegression, RidgeRegressionParameters};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Penalty {
    None,
    Ridge { alpha: f64 },
    Lasso { alpha: f64 },
}

/// Linear regression of next close on the training features, refit per request.
///
/// The unpenalized variant is the headline `LinearRegression` model; ridge and lasso
/// run as auxiliaries.
#[derive(Debug, Clone)]
pub struct LinearModelStrategy {
    name: String,
    penalty: Penalty,
    role: StrategyRole,
}

impl LinearModelStrategy {
    pub fn ordinary() -> Self {
        Self {
            name: "LinearRegression".to_string(),
            penalty: Penalty::None,
            role: StrategyRole::Headline,
        }
    }

    pub fn ridge(alpha: f64) -> Self {
        Self {
            name: "Ridge".to_string(),
            penalty: Penalty::Ridge { alpha },
            role: StrategyRole::Auxiliary,
        }
    }

    pub fn lasso(alpha: f64) -> Self {
        Self {
            name: "Lasso".to_string(),
            penalty: Penalty::Lasso { alpha },
            role: StrategyRole::Auxiliary,
        }
    }

    pub fn penalty(&self) -> Penalty {
        self.penalty
    }

    fn fit_predict(
        &self,
        x: &DenseMatrix<f64>,
        y: &Vec<f64>,
        last: &DenseMatrix<f64>,
    ) -> Result<Vec<f64>, smartcore::error::Failed> {
        match self.penalty {
            Penalty::None => {
                let model: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>> =
                    LinearRegression::fit(x, y, LinearRegressionParameters::default())?;
                model.predict(last)
            }
            Penalty::Ridge { alpha } => {
                let model: RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>> =
                    RidgeRegression::fit(
                        x,
                        y,
                        RidgeRegressionParameters::default().with_alpha(alpha),
                    )?;
                model.predict(last)
            }
            Penalty::Lasso { alpha } => {
                let model: Lasso<f64, f64, DenseMatrix<f64>, Vec<f64>> =
                    Lasso::fit(x, y, LassoParameters::default().with_alpha(alpha))?;
                model.predict(last)
            }
        }
    }
}

impl PriceStrategy for LinearModelStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn role(&self) -> StrategyRole {
        self.role
    }

    fn required_features(&self) -> &[Feature] {
        TRAINING_FEATURES
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let set = TrainingSet::prepare(ctx, TRAINING_FEATURES)?;
        ctx.cancel.check()?;
        let x = set.x_matrix()?;
        let last = set.last_matrix()?;
        let predictions = self.fit_predict(&x, &set.y, &last).map_err(|e| {
            debug!("{} fit failed: {}", self.name, e);
            FailureReason::FitFailed
        })?;
        single_prediction(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::synthetic_history;
    use std::sync::Arc;

    fn ctx(n: usize) -> StrategyContext {
        let history = synthetic_history(n, 7);
        let latest = history.latest().cloned().unwrap();
        StrategyContext::new(Arc::new(latest), Arc::new(history))
    }

    #[test]
    fn test_ordinary_is_headline() {
        let s = LinearModelStrategy::ordinary();
        assert_eq!(s.name(), "LinearRegression");
        assert_eq!(s.role(), StrategyRole::Headline);
        assert_eq!(LinearModelStrategy::ridge(1.0).role(), StrategyRole::Auxiliary);
    }

    #[test]
    fn test_predictions_stay_near_price() {
        let c = ctx(320);
        let last_close = c.features.close.unwrap();
        for strategy in [
            LinearModelStrategy::ordinary(),
            LinearModelStrategy::ridge(1.0),
            LinearModelStrategy::lasso(0.01),
        ] {
            let p = strategy.predict(&c).expect("fit should succeed");
            assert!(p.is_finite());
            assert!(
                (p - last_close).abs() / last_close < 0.25,
                "{} predicted {} vs close {}",
                strategy.name(),
                p,
                last_close
            );
        }
    }

    #[test]
    fn test_short_history_fails_cleanly() {
        // Warm-up rows carry null MA_200, so nothing is usable.
        let c = ctx(150);
        let err = LinearModelStrategy::ordinary().predict(&c).unwrap_err();
        assert_eq!(err, FailureReason::InsufficientFeatures);
    }
}
