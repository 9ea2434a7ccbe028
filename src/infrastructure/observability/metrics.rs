//! Prometheus metrics definitions for Stockcast
//!
//! All metrics use the `stockcast_` prefix and are read-only.

use crate::domain::forecast::{StrategyResult, StrategyResults};
use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGauge},
};
use std::sync::Arc;

/// Prometheus metrics for the forecasting pipeline
#[derive(Clone)]
pub struct ForecastMetrics {
    registry: Arc<Registry>,
    /// Forecast requests by outcome
    pub forecasts_total: CounterVec,
    /// Strategy outcomes by strategy and status/failure reason
    pub strategy_results_total: CounterVec,
    /// End-to-end forecast latency in seconds
    pub forecast_latency_seconds: HistogramVec,
    /// Successful strategies in the last forecast
    pub last_num_strategies: GenericGauge<AtomicF64>,
    /// Regime assignments by cluster id ("none" when unavailable)
    pub regime_assignments_total: CounterVec,
}

impl ForecastMetrics {
    /// Create a new metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let forecasts_total = CounterVec::new(
            Opts::new("stockcast_forecasts_total", "Total forecast requests by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(forecasts_total.clone()))?;

        let strategy_results_total = CounterVec::new(
            Opts::new(
                "stockcast_strategy_results_total",
                "Strategy outcomes by strategy and result",
            ),
            &["strategy", "result"],
        )?;
        registry.register(Box::new(strategy_results_total.clone()))?;

        let forecast_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "stockcast_forecast_latency_seconds",
                "Forecast latency in seconds",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]),
            &["ensemble_method"],
        )?;
        registry.register(Box::new(forecast_latency_seconds.clone()))?;

        let last_num_strategies = Gauge::with_opts(Opts::new(
            "stockcast_last_num_strategies",
            "Successful strategies in the most recent forecast",
        ))?;
        registry.register(Box::new(last_num_strategies.clone()))?;

        let regime_assignments_total = CounterVec::new(
            Opts::new(
                "stockcast_regime_assignments_total",
                "Regime assignments by cluster id",
            ),
            &["regime"],
        )?;
        registry.register(Box::new(regime_assignments_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            forecasts_total,
            strategy_results_total,
            forecast_latency_seconds,
            last_num_strategies,
            regime_assignments_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_forecast(&self, outcome: &str) {
        self.forecasts_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_strategy_results(&self, results: &StrategyResults) {
        for (name, result) in &results.results {
            let label = match result {
                StrategyResult::Success { .. } => "success",
                StrategyResult::Failure { reason } => reason.as_str(),
            };
            self.strategy_results_total
                .with_label_values(&[name.as_str(), label])
                .inc();
        }
    }

    pub fn observe_latency(&self, ensemble_method: &str, seconds: f64) {
        self.forecast_latency_seconds
            .with_label_values(&[ensemble_method])
            .observe(seconds);
    }

    pub fn record_regime(&self, regime: Option<usize>) {
        let label = regime.map_or_else(|| "none".to_string(), |id| id.to_string());
        self.regime_assignments_total
            .with_label_values(&[label.as_str()])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forecast::FailureReason;

    #[test]
    fn test_render_contains_prefixed_metrics() {
        let metrics = ForecastMetrics::new().unwrap();
        metrics.inc_forecast("success");
        metrics.observe_latency("equal_weight", 0.2);
        metrics.record_regime(None);

        let mut results = StrategyResults::default();
        results.results.insert(
            "LSTM".to_string(),
            StrategyResult::failure(FailureReason::ModelLoading),
        );
        metrics.record_strategy_results(&results);

        let text = metrics.render();
        assert!(text.contains("stockcast_forecasts_total{outcome=\"success\"} 1"));
        assert!(text.contains("result=\"model_loading\""));
        assert!(text.contains("stockcast_regime_assignments_total{regime=\"none\"} 1"));
        assert!(text.contains("stockcast_forecast_latency_seconds_bucket"));
    }
}
