use crate::application::strategies::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::FailureReason;

/// Holt's linear (additive trend) exponential smoothing.
///
/// Smoothing factors are picked from a fixed grid by minimum one-step-ahead squared
/// error over the training window, then the series is forecast one step ahead.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothingStrategy {
    grid: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct HoltFit {
    alpha: f64,
    beta: f64,
    sse: f64,
    forecast: f64,
}

impl ExponentialSmoothingStrategy {
    pub fn new(grid: Vec<f64>) -> Self {
        Self { grid }
    }

    fn run(series: &[f64], alpha: f64, beta: f64) -> HoltFit {
        let mut level = series[0];
        let mut trend = series[1] - series[0];
        let mut sse = 0.0;
        for &value in &series[1..] {
            let expected = level + trend;
            sse += (value - expected).powi(2);
            let prev_level = level;
            level = alpha * value + (1.0 - alpha) * (level + trend);
            trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        }
        HoltFit {
            alpha,
            beta,
            sse,
            forecast: level + trend,
        }
    }

    fn best_fit(&self, ctx: &StrategyContext, series: &[f64]) -> Result<HoltFit, FailureReason> {
        let mut best: Option<HoltFit> = None;
        for &alpha in &self.grid {
            ctx.cancel.check()?;
            for &beta in &self.grid {
                let fit = Self::run(series, alpha, beta);
                // Strict comparison keeps the first grid point on ties.
                if fit.sse.is_finite() && best.is_none_or(|b| fit.sse < b.sse) {
                    best = Some(fit);
                }
            }
        }
        best.ok_or(FailureReason::FitFailed)
    }
}

impl Default for ExponentialSmoothingStrategy {
    fn default() -> Self {
        Self::new((1..=9).map(|i| i as f64 / 10.0).collect())
    }
}

impl PriceStrategy for ExponentialSmoothingStrategy {
    fn name(&self) -> &str {
        "ExponentialSmoothing"
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let series: Vec<f64> = ctx
            .history
            .tail(ctx.training_window)
            .iter()
            .filter_map(|r| r.close)
            .collect();
        if series.len() < ctx.min_training_rows.max(3) {
            return Err(FailureReason::InsufficientHistory);
        }
        Ok(self.best_fit(ctx, &series)?.forecast)
    }
}
