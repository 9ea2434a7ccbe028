use crate::application::ensemble::{EnsembleAggregator, RegimeWeightTable};
use crate::application::forecast_assembler::{ForecastResponse, assemble};
use crate::application::regime::{RegimeConfig, RegimeDetector};
use crate::application::series::{IndicatorPoint, indicator_series};
use crate::application::strategies::StrategyFactory;
use crate::application::strategy_pool::{PoolConfig, StrategyPool};
use crate::config::Config;
use crate::domain::errors::ForecastError;
use crate::domain::forecast::EnsembleMethod;
use crate::domain::market::feature_vector::FeatureHistory;
use crate::domain::market::interval::Interval;
use crate::domain::market::market_regime::{RegimeAssignment, RegimeUnavailable};
use crate::domain::ports::FeatureSource;
use crate::infrastructure::observability::ForecastMetrics;
use anyhow::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

/// Entry point of the forecasting core: load, fan out, fan in, package.
pub struct Forecaster {
    source: Arc<dyn FeatureSource>,
    pool: Arc<StrategyPool>,
    detector: Arc<RegimeDetector>,
    aggregator: EnsembleAggregator,
    metrics: Option<ForecastMetrics>,
}

impl Forecaster {
    pub fn new(
        source: Arc<dyn FeatureSource>,
        pool: StrategyPool,
        detector: RegimeDetector,
        aggregator: EnsembleAggregator,
    ) -> Self {
        Self {
            source,
            pool: Arc::new(pool),
            detector: Arc::new(detector),
            aggregator,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: ForecastMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Standard strategy set, detector and aggregator as configured.
    pub fn from_config(config: &Config, source: Arc<dyn FeatureSource>) -> anyhow::Result<Self> {
        let registry = StrategyFactory::standard(&config.forecast)?;
        let pool = StrategyPool::new(registry, PoolConfig::from(&config.forecast));
        let detector = RegimeDetector::new(RegimeConfig::from(&config.regime));

        let mut aggregator = EnsembleAggregator::new(config.forecast.ensemble_method);
        if let Some(path) = &config.forecast.regime_weights_path {
            let table = RegimeWeightTable::load(path)
                .with_context(|| format!("Failed to load regime weights from {}", path.display()))?;
            aggregator = aggregator.with_weights(table);
        } else if config.forecast.ensemble_method == EnsembleMethod::RegimeWeighted {
            warn!("ENSEMBLE_METHOD=regime_weighted without REGIME_WEIGHTS_PATH: every forecast will fall back to equal weight");
        }

        let mut forecaster = Self::new(source, pool, detector, aggregator);
        if config.observability.enabled {
            forecaster = forecaster.with_metrics(ForecastMetrics::new()?);
        }
        Ok(forecaster)
    }

    pub fn pool(&self) -> &StrategyPool {
        &self.pool
    }

    pub fn metrics(&self) -> Option<&ForecastMetrics> {
        self.metrics.as_ref()
    }

    /// Start loading heavy models ahead of the first request.
    pub fn warm_up(&self) {
        self.pool.warm_up();
    }

    /// Warm up and wait, bounded by `timeout` and the pool deadline, for the models to
    /// settle. One-shot callers use this so a model is not reported as still loading.
    pub async fn warm_up_and_wait(&self, timeout: Duration) -> bool {
        self.pool.warm_up_and_wait(timeout).await
    }

    pub async fn forecast(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<ForecastResponse, ForecastError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("forecast", %request_id, symbol, %interval);
        let started = Instant::now();

        let outcome = self.run_forecast(symbol, interval).instrument(span).await;
        if let Some(metrics) = &self.metrics {
            let label = match &outcome {
                Ok(_) => "success",
                Err(ForecastError::NoData { .. }) => "no_data",
                Err(ForecastError::InvalidCurrentPrice { .. }) => "invalid_price",
                Err(ForecastError::InsufficientModels { .. }) => "insufficient_models",
                Err(ForecastError::Source(_)) => "source_error",
            };
            metrics.inc_forecast(label);
            if let Ok(response) = &outcome {
                metrics.observe_latency(
                    response.details.ensemble_method.as_str(),
                    started.elapsed().as_secs_f64(),
                );
                metrics.last_num_strategies.set(response.details.num_strategies as f64);
            }
        }
        outcome
    }

    async fn run_forecast(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<ForecastResponse, ForecastError> {
        let history = self.load(symbol, interval).await?;
        let latest = history
            .latest()
            .cloned()
            .ok_or_else(|| no_data(symbol, interval))?;
        let current_price = latest.close.unwrap_or(f64::NAN);
        if !(current_price.is_finite() && current_price > 0.0) {
            return Err(ForecastError::InvalidCurrentPrice {
                price: current_price,
            });
        }

        let history = Arc::new(history);
        let detector = self.detector.clone();
        let regime_history = history.clone();
        let (results, regime) = tokio::join!(
            self.pool.run_all(Arc::new(latest), history),
            tokio::task::spawn_blocking(move || detector.detect(&regime_history)),
        );
        let regime = regime.unwrap_or_else(|e| {
            warn!("Regime detection task failed: {}", e);
            RegimeAssignment::unavailable(RegimeUnavailable::ClusteringFailed(e.to_string()), 0)
        });

        if let Some(metrics) = &self.metrics {
            metrics.record_strategy_results(&results);
            metrics.record_regime(regime.cluster_regime);
        }

        let forecast = self
            .aggregator
            .aggregate(&results, &regime, current_price)
            .inspect_err(|e| {
                if e.is_health_problem() {
                    warn!("No strategy produced a prediction: {}", e);
                }
            })?;

        info!(
            "Forecast {} -> {:.4} {} ({}), {} strategies, regime {:?}, method {}",
            forecast.current_price,
            forecast.predicted_next_close,
            forecast.direction,
            forecast.expected_change_pct,
            forecast.num_strategies,
            forecast.cluster_regime,
            forecast.ensemble_method
        );
        Ok(assemble(forecast, symbol, interval))
    }

    /// Historical indicator series, most recent `limit` periods.
    pub async fn indicator_series(
        &self,
        symbol: &str,
        interval: Interval,
        limit: usize,
    ) -> Result<Vec<IndicatorPoint>, ForecastError> {
        let history = self.load(symbol, interval).await?;
        if history.is_empty() {
            return Err(no_data(symbol, interval));
        }
        Ok(indicator_series(&history, limit))
    }

    async fn load(&self, symbol: &str, interval: Interval) -> Result<FeatureHistory, ForecastError> {
        let history = self
            .source
            .load_history(symbol, interval)
            .await
            .with_context(|| format!("Failed to load history for {} {}", symbol, interval))?;
        if history.is_empty() {
            return Err(no_data(symbol, interval));
        }
        Ok(history)
    }
}

fn no_data(symbol: &str, interval: Interval) -> ForecastError {
    ForecastError::NoData {
        symbol: symbol.trim().to_uppercase(),
        interval: interval.to_string(),
    }
}
