use crate::application::strategies::training::{single_prediction, to_matrix};
use crate::application::strategies::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::FailureReason;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{LinearRegression, LinearRegressionParameters};
use tracing::debug;

/// ARIMA(p, 1, 0): autoregression of order `p` on first differences of the close,
/// fitted by least squares. The forecast is the last close plus the predicted change.
#[derive(Debug, Clone)]
pub struct AutoregressiveStrategy {
    order: usize,
}

impl AutoregressiveStrategy {
    pub fn new(order: usize) -> Self {
        Self {
            order: order.max(1),
        }
    }

    /// Lagged design: row `t` holds `d[t-1] .. d[t-p]`, target `d[t]`.
    fn design(&self, diffs: &[f64]) -> (Vec<Vec<f64>>, Vec<f64>) {
        let p = self.order;
        let mut x = Vec::with_capacity(diffs.len().saturating_sub(p));
        let mut y = Vec::with_capacity(diffs.len().saturating_sub(p));
        for t in p..diffs.len() {
            x.push((1..=p).map(|lag| diffs[t - lag]).collect());
            y.push(diffs[t]);
        }
        (x, y)
    }
}

impl Default for AutoregressiveStrategy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PriceStrategy for AutoregressiveStrategy {
    fn name(&self) -> &str {
        "ARIMA"
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let closes: Vec<f64> = ctx
            .history
            .tail(ctx.training_window + 1)
            .iter()
            .filter_map(|r| r.close)
            .collect();
        let last_close = *closes.last().ok_or(FailureReason::InsufficientHistory)?;

        let diffs: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
        let (x, y) = self.design(&diffs);
        if y.len() < ctx.min_training_rows {
            return Err(FailureReason::InsufficientHistory);
        }

        let next_lags: Vec<f64> = (0..self.order)
            .map(|lag| diffs[diffs.len() - 1 - lag])
            .collect();

        let x = to_matrix(&x)?;
        let model: LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>> =
            LinearRegression::fit(&x, &y, LinearRegressionParameters::default()).map_err(|e| {
                debug!("ARIMA fit failed: {}", e);
                FailureReason::FitFailed
            })?;
        let step = single_prediction(
            model
                .predict(&to_matrix(&[next_lags])?)
                .map_err(|_| FailureReason::FitFailed)?,
        )?;

        Ok(last_close + step)
    }
}
