use crate::application::ml::model_handle::LazyModel;
use crate::application::ml::onnx_predictor::OnnxSequencePredictor;
use crate::application::ml::predictor::SequencePredictor;
use crate::application::strategies::{
    AutoregressiveStrategy, BollingerReversionStrategy, ExponentialSmoothingStrategy,
    GradientBoostingStrategy, LinearModelStrategy, MovingAverageCrossoverStrategy,
    NearestNeighborsStrategy, PriceStrategy, RandomForestStrategy, RsiReversalStrategy,
    SequenceModelStrategy, SharedSequenceModel, SupportVectorStrategy,
};
use crate::config::ForecastEnvConfig;
use crate::domain::forecast::StrategyRole;
use anyhow::Result;
use std::sync::Arc;

/// Ordered set of uniquely named strategies.
#[derive(Clone, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn PriceStrategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: Arc<dyn PriceStrategy>) -> Result<()> {
        if self.get(strategy.name()).is_some() {
            anyhow::bail!("Strategy '{}' is already registered", strategy.name());
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub fn with(mut self, strategy: Arc<dyn PriceStrategy>) -> Result<Self> {
        self.register(strategy)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn PriceStrategy>> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    pub fn strategies(&self) -> &[Arc<dyn PriceStrategy>] {
        &self.strategies
    }

    pub fn names(&self) -> Vec<String> {
        self.strategies.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn headline_names(&self) -> Vec<String> {
        self.strategies
            .iter()
            .filter(|s| s.role() == StrategyRole::Headline)
            .map(|s| s.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

pub struct StrategyFactory;

impl StrategyFactory {
    /// Handle for the ONNX sequence model named by the configuration. Nothing is read
    /// from disk until the handle starts loading.
    pub fn sequence_model(config: &ForecastEnvConfig) -> SharedSequenceModel {
        let path = config.lstm_model_path();
        let sequence_length = config.lstm_sequence_length;
        Arc::new(LazyModel::new(SequenceModelStrategy::NAME, move || {
            let predictor = OnnxSequencePredictor::load(&path, sequence_length)?;
            Ok(Box::new(predictor) as Box<dyn SequencePredictor>)
        }))
    }

    /// The three headline models followed by the auxiliary set.
    pub fn standard(config: &ForecastEnvConfig) -> Result<StrategyRegistry> {
        Self::standard_with_model(Self::sequence_model(config))
    }

    pub fn standard_with_model(sequence_model: SharedSequenceModel) -> Result<StrategyRegistry> {
        StrategyRegistry::new()
            .with(Arc::new(LinearModelStrategy::ordinary()))?
            .with(Arc::new(GradientBoostingStrategy::default()))?
            .with(Arc::new(SequenceModelStrategy::new(sequence_model)))?
            .with(Arc::new(AutoregressiveStrategy::default()))?
            .with(Arc::new(ExponentialSmoothingStrategy::default()))?
            .with(Arc::new(LinearModelStrategy::ridge(1.0)))?
            .with(Arc::new(LinearModelStrategy::lasso(0.01)))?
            .with(Arc::new(RandomForestStrategy::default()))?
            .with(Arc::new(GradientBoostingStrategy::lgbm()))?
            .with(Arc::new(SupportVectorStrategy::default()))?
            .with(Arc::new(NearestNeighborsStrategy::default()))?
            .with(Arc::new(MovingAverageCrossoverStrategy::default()))?
            .with(Arc::new(RsiReversalStrategy::default()))?
            .with(Arc::new(BollingerReversionStrategy))
    }
}
