//! Shared feature/target preparation for the fitted regression strategies.

use super::traits::StrategyContext;
use crate::domain::forecast::FailureReason;
use crate::domain::ml::feature_registry::Feature;
use smartcore::linalg::basic::matrix::DenseMatrix;
use statrs::statistics::Statistics;
use tracing::debug;

/// Supervised rows drawn from the trailing window: `x[i]` are the features of
/// period `t`, `y[i]` the close of period `t + 1`. `last` holds the latest
/// snapshot's features, the row to predict from.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
    pub last: Vec<f64>,
}

impl TrainingSet {
    pub fn prepare(ctx: &StrategyContext, features: &[Feature]) -> Result<Self, FailureReason> {
        let last = ctx
            .features
            .select(features)
            .map_err(|_| FailureReason::InsufficientFeatures)?;

        // One extra row: the oldest row's target is the next one's close.
        let rows = ctx.history.tail(ctx.training_window + 1);
        let mut x = Vec::with_capacity(rows.len());
        let mut y = Vec::with_capacity(rows.len());
        for pair in rows.windows(2) {
            let (Ok(inputs), Some(target)) = (pair[0].select(features), pair[1].close) else {
                continue;
            };
            x.push(inputs);
            y.push(target);
        }

        if x.len() < ctx.min_training_rows {
            debug!(
                "Training set too small: {} rows < {}",
                x.len(),
                ctx.min_training_rows
            );
            return Err(FailureReason::InsufficientHistory);
        }

        Ok(Self { x, y, last })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x_matrix(&self) -> Result<DenseMatrix<f64>, FailureReason> {
        to_matrix(&self.x)
    }

    pub fn last_matrix(&self) -> Result<DenseMatrix<f64>, FailureReason> {
        to_matrix(std::slice::from_ref(&self.last))
    }

    /// Z-score every column with the training statistics (constant columns keep scale 1).
    pub fn standardized(&self) -> Self {
        let scaler = ColumnScaler::fit(&self.x);
        Self {
            x: self.x.iter().map(|row| scaler.transform(row)).collect(),
            y: self.y.clone(),
            last: scaler.transform(&self.last),
        }
    }
}

pub fn to_matrix(rows: &[Vec<f64>]) -> Result<DenseMatrix<f64>, FailureReason> {
    DenseMatrix::from_2d_vec(&rows.to_vec()).map_err(|e| {
        debug!("Matrix creation failed: {}", e);
        FailureReason::FitFailed
    })
}

/// First element of a single-row prediction.
pub fn single_prediction(predictions: Vec<f64>) -> Result<f64, FailureReason> {
    predictions.first().copied().ok_or(FailureReason::FitFailed)
}

#[derive(Debug, Clone)]
struct ColumnScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl ColumnScaler {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut means = Vec::with_capacity(width);
        let mut stds = Vec::with_capacity(width);
        for col in 0..width {
            let values: Vec<f64> = rows.iter().map(|r| r[col]).collect();
            let std = values.iter().population_std_dev();
            means.push(values.iter().mean());
            stds.push(if std.is_finite() && std > 0.0 { std } else { 1.0 });
        }
        Self { means, stds }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(v, (m, s))| (v - m) / s)
            .collect()
    }
}
