use super::traits::{PriceStrategy, StrategyContext};
use crate::application::ml::model_handle::{LazyModel, ModelState};
use crate::application::ml::predictor::SequencePredictor;
use crate::domain::forecast::{FailureReason, StrategyRole};
use crate::domain::ml::feature_registry::Feature;
use std::sync::Arc;
use tracing::debug;

/// Model inputs, close last. Min-max scaled per column over the training window.
pub const SEQUENCE_FEATURES: &[Feature] = &[
    Feature::Open,
    Feature::High,
    Feature::Low,
    Feature::Volume,
    Feature::Ma10,
    Feature::Ma50,
    Feature::Ma200,
    Feature::Rsi,
    Feature::Macd,
    Feature::Volatility,
    Feature::Close,
];

pub type SharedSequenceModel = Arc<LazyModel<Box<dyn SequencePredictor>>>;

/// Headline recurrent model. Inference only: the network is trained offline and
/// served through a lazily loaded handle.
pub struct SequenceModelStrategy {
    model: SharedSequenceModel,
}

struct MinMax {
    min: f64,
    max: f64,
}

impl MinMax {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            Self {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |acc, v| Self {
                min: acc.min.min(v),
                max: acc.max.max(v),
            },
        )
    }

    fn scale(&self, v: f64) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 { (v - self.min) / range } else { 0.0 }
    }

    fn invert(&self, v: f64) -> f64 {
        self.min + v * (self.max - self.min)
    }
}

impl SequenceModelStrategy {
    pub const NAME: &'static str = "LSTM";

    pub fn new(model: SharedSequenceModel) -> Self {
        Self { model }
    }

    /// Scaled input window plus the close scaler used to map the output back.
    fn build_window(
        ctx: &StrategyContext,
        sequence_length: usize,
    ) -> Result<(Vec<Vec<f32>>, MinMax), FailureReason> {
        let rows: Vec<Vec<f64>> = ctx
            .history
            .tail(ctx.training_window)
            .iter()
            .filter_map(|r| r.select(SEQUENCE_FEATURES).ok())
            .collect();
        if rows.len() < sequence_length.max(ctx.min_training_rows) {
            return Err(FailureReason::InsufficientHistory);
        }

        let scalers: Vec<MinMax> = (0..SEQUENCE_FEATURES.len())
            .map(|col| MinMax::of(rows.iter().map(|r| r[col])))
            .collect();

        let window = rows[rows.len() - sequence_length..]
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&scalers)
                    .map(|(v, s)| s.scale(*v) as f32)
                    .collect()
            })
            .collect();

        let close_scaler = scalers
            .into_iter()
            .last()
            .ok_or(FailureReason::InsufficientFeatures)?;
        Ok((window, close_scaler))
    }
}

impl PriceStrategy for SequenceModelStrategy {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn role(&self) -> StrategyRole {
        StrategyRole::Headline
    }

    fn required_features(&self) -> &[Feature] {
        SEQUENCE_FEATURES
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let model = self.model.get()?;
        let (window, close_scaler) = Self::build_window(ctx, model.sequence_length())?;
        ctx.cancel.check()?;

        let scaled = model.predict_sequence(&window).map_err(|e| {
            debug!("{}: inference failed: {}", model.name(), e);
            FailureReason::FitFailed
        })?;
        Ok(close_scaler.invert(scaled as f64))
    }

    fn warm_up(&self) {
        self.model.start_loading();
    }

    fn is_warm(&self) -> bool {
        matches!(self.model.state(), ModelState::Ready | ModelState::LoadFailed)
    }
}
