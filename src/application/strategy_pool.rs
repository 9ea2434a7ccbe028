use crate::application::strategies::{CancelFlag, PriceStrategy, StrategyContext, StrategyRegistry};
use crate::config::ForecastEnvConfig;
use crate::domain::forecast::{FailureReason, StrategyResult, StrategyResults};
use crate::domain::market::feature_vector::{FeatureHistory, FeatureVector};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

const WARM_UP_POLL: Duration = Duration::from_millis(10);

/// Execution budget of one pool run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolConfig {
    pub strategy_timeout: Duration,
    pub deadline: Duration,
    pub training_window: usize,
    pub min_training_rows: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            strategy_timeout: Duration::from_millis(5000),
            deadline: Duration::from_millis(15000),
            training_window: 500,
            min_training_rows: 30,
        }
    }
}

impl From<&ForecastEnvConfig> for PoolConfig {
    fn from(config: &ForecastEnvConfig) -> Self {
        Self {
            strategy_timeout: config.strategy_timeout,
            deadline: config.pool_deadline,
            training_window: config.training_window,
            min_training_rows: config.min_training_rows,
        }
    }
}

/// Runs every registered strategy against the same snapshot and collects one
/// `StrategyResult` per strategy. A strategy that fails, panics, hangs or returns a
/// non-finite price only produces a failure entry; the run itself never fails.
pub struct StrategyPool {
    registry: StrategyRegistry,
    config: PoolConfig,
}

impl StrategyPool {
    pub fn new(registry: StrategyRegistry, config: PoolConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Start loading heavy models in the background.
    pub fn warm_up(&self) {
        for strategy in self.registry.strategies() {
            strategy.warm_up();
        }
    }

    /// Start warm-up and wait until every strategy has settled, for at most `timeout`
    /// capped by the pool deadline. Returns false if something was still loading.
    pub async fn warm_up_and_wait(&self, timeout: Duration) -> bool {
        self.warm_up();
        let strategies = self.registry.strategies().to_vec();
        let deadline = std::time::Instant::now() + timeout.min(self.config.deadline);

        let settled = tokio::task::spawn_blocking(move || {
            loop {
                if strategies.iter().all(|s| s.is_warm()) {
                    return true;
                }
                if std::time::Instant::now() >= deadline {
                    return false;
                }
                std::thread::sleep(WARM_UP_POLL);
            }
        })
        .await
        .unwrap_or(false);

        if !settled {
            warn!("Warm-up still in progress after {:?}", timeout.min(self.config.deadline));
        }
        settled
    }

    pub async fn run_all(
        &self,
        features: Arc<FeatureVector>,
        history: Arc<FeatureHistory>,
    ) -> StrategyResults {
        let started = Instant::now();
        let pool_deadline = started + self.config.deadline;

        // Dropping this future cancels every strategy still running.
        let pool_cancel = CancelFlag::new();
        let _cancel_on_drop = pool_cancel.guard();

        let base = StrategyContext::new(features, history)
            .with_training_window(self.config.training_window, self.config.min_training_rows);

        let runs = self.registry.strategies().iter().map(|strategy| {
            let ctx = base.clone().with_cancel(pool_cancel.child());
            let own_deadline = started + self.config.strategy_timeout;
            let strategy = strategy.clone();
            async move {
                let name = strategy.name().to_string();
                let result = Self::run_one(strategy, ctx, own_deadline, pool_deadline).await;
                (name, result)
            }
        });

        let mut results = StrategyResults {
            headline: self.registry.headline_names(),
            ..Default::default()
        };
        for (name, result) in join_all(runs).await {
            if let StrategyResult::Failure { reason } = &result {
                warn!("Strategy {} failed: {}", name, reason);
            }
            results.results.insert(name, result);
        }

        debug!(
            "Strategy pool finished in {:?}: {}/{} succeeded",
            started.elapsed(),
            results.success_count(),
            results.len()
        );
        results
    }

    async fn run_one(
        strategy: Arc<dyn PriceStrategy>,
        ctx: StrategyContext,
        own_deadline: Instant,
        pool_deadline: Instant,
    ) -> StrategyResult {
        if let Some(missing) = strategy
            .required_features()
            .iter()
            .find(|f| ctx.features.get(**f).is_none())
        {
            debug!("Strategy {} skipped: {} is null", strategy.name(), missing);
            return StrategyResult::failure(FailureReason::InsufficientFeatures);
        }

        let cancel = ctx.cancel.clone();
        let name = strategy.name().to_string();
        let task_started = Instant::now();
        let task = tokio::task::spawn_blocking(move || strategy.predict(&ctx));

        let result = match tokio::time::timeout_at(own_deadline.min(pool_deadline), task).await {
            Ok(Ok(prediction)) => StrategyResult::from_prediction(prediction),
            Ok(Err(join_error)) if join_error.is_panic() => {
                StrategyResult::failure(FailureReason::Panicked)
            }
            Ok(Err(_)) => StrategyResult::failure(FailureReason::Cancelled),
            Err(_) => {
                // The blocking thread cannot be aborted; it sees the flag at its next check.
                cancel.cancel();
                let reason = if own_deadline <= pool_deadline {
                    FailureReason::Timeout
                } else {
                    FailureReason::DeadlineExceeded
                };
                StrategyResult::failure(reason)
            }
        };

        debug!("Strategy {} ran in {:?}", name, task_started.elapsed());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ml::model_handle::{LazyModel, ModelState};
    use crate::application::ml::predictor::SequencePredictor;
    use crate::application::strategies::SequenceModelStrategy;
    use crate::domain::forecast::StrategyRole;
    use crate::domain::ml::feature_registry::Feature;
    use chrono::{TimeZone, Utc};

    enum Behavior {
        Price(f64),
        Fail(FailureReason),
        Panic,
        Sleep(Duration),
        /// Spins until cancelled, then reports how it ended.
        SpinUntilCancelled(Arc<std::sync::atomic::AtomicBool>),
    }

    struct Fake {
        name: &'static str,
        role: StrategyRole,
        behavior: Behavior,
        requires: &'static [Feature],
    }

    impl Fake {
        fn new(name: &'static str, behavior: Behavior) -> Self {
            Self {
                name,
                role: StrategyRole::Auxiliary,
                behavior,
                requires: &[],
            }
        }
    }

    impl PriceStrategy for Fake {
        fn name(&self) -> &str {
            self.name
        }

        fn role(&self) -> StrategyRole {
            self.role
        }

        fn required_features(&self) -> &[Feature] {
            self.requires
        }

        fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
            match &self.behavior {
                Behavior::Price(p) => Ok(*p),
                Behavior::Fail(reason) => Err(reason.clone()),
                Behavior::Panic => panic!("boom"),
                Behavior::Sleep(d) => {
                    std::thread::sleep(*d);
                    Ok(1.0)
                }
                Behavior::SpinUntilCancelled(seen) => {
                    while !ctx.cancel.is_cancelled() {
                        std::thread::sleep(Duration::from_millis(5));
                    }
                    seen.store(true, std::sync::atomic::Ordering::SeqCst);
                    Err(FailureReason::Cancelled)
                }
            }
        }
    }

    fn snapshot() -> (Arc<FeatureVector>, Arc<FeatureHistory>) {
        let ts = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let latest = FeatureVector::new(ts).with(Feature::Close, 100.0);
        let history = FeatureHistory::new(vec![latest.clone()]);
        (Arc::new(latest), Arc::new(history))
    }

    fn pool(strategies: Vec<Fake>, config: PoolConfig) -> StrategyPool {
        let mut registry = StrategyRegistry::new();
        for s in strategies {
            registry.register(Arc::new(s)).unwrap();
        }
        StrategyPool::new(registry, config)
    }

    fn fast_config() -> PoolConfig {
        PoolConfig {
            strategy_timeout: Duration::from_millis(100),
            deadline: Duration::from_millis(1000),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_every_strategy_gets_exactly_one_result() {
        let mut headline = Fake::new("Head", Behavior::Price(101.0));
        headline.role = StrategyRole::Headline;
        let pool = pool(
            vec![
                headline,
                Fake::new("Ok", Behavior::Price(99.5)),
                Fake::new("Nan", Behavior::Price(f64::NAN)),
                Fake::new("Panics", Behavior::Panic),
                Fake::new("Slow", Behavior::Sleep(Duration::from_millis(400))),
                Fake::new("Refuses", Behavior::Fail(FailureReason::FitFailed)),
            ],
            fast_config(),
        );

        let (features, history) = snapshot();
        let results = pool.run_all(features, history).await;

        assert_eq!(results.len(), 6);
        assert_eq!(results.headline, vec!["Head".to_string()]);
        assert_eq!(results.success_count(), 2);
        let reason = |name: &str| match &results.results[name] {
            StrategyResult::Failure { reason } => reason.clone(),
            other => panic!("{} unexpectedly produced {:?}", name, other),
        };
        assert_eq!(reason("Nan"), FailureReason::NonFiniteOutput);
        assert_eq!(reason("Panics"), FailureReason::Panicked);
        assert_eq!(reason("Slow"), FailureReason::Timeout);
        assert_eq!(reason("Refuses"), FailureReason::FitFailed);
    }

    #[tokio::test]
    async fn test_missing_required_feature_skips_strategy() {
        let mut needs_rsi = Fake::new("NeedsRsi", Behavior::Price(1.0));
        needs_rsi.requires = &[Feature::Rsi];
        let pool = pool(vec![needs_rsi], fast_config());

        let (features, history) = snapshot();
        let results = pool.run_all(features, history).await;
        assert_eq!(
            results.results["NeedsRsi"],
            StrategyResult::failure(FailureReason::InsufficientFeatures)
        );
    }

    #[tokio::test]
    async fn test_pool_deadline_caps_strategy_timeout() {
        let config = PoolConfig {
            strategy_timeout: Duration::from_millis(5000),
            deadline: Duration::from_millis(50),
            ..Default::default()
        };
        let pool = pool(
            vec![Fake::new("Slow", Behavior::Sleep(Duration::from_millis(300)))],
            config,
        );
        let (features, history) = snapshot();
        let results = pool.run_all(features, history).await;
        assert_eq!(
            results.results["Slow"],
            StrategyResult::failure(FailureReason::DeadlineExceeded)
        );
    }

    #[tokio::test]
    async fn test_timed_out_strategy_is_cancelled() {
        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let pool = pool(
            vec![Fake::new("Spinner", Behavior::SpinUntilCancelled(seen.clone()))],
            fast_config(),
        );
        let (features, history) = snapshot();
        let results = pool.run_all(features, history).await;
        assert_eq!(
            results.results["Spinner"],
            StrategyResult::failure(FailureReason::Timeout)
        );

        for _ in 0..100 {
            if seen.load(std::sync::atomic::Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dropping_run_cancels_running_strategies() {
        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let config = PoolConfig {
            strategy_timeout: Duration::from_secs(30),
            deadline: Duration::from_secs(30),
            ..Default::default()
        };
        let pool = pool(
            vec![Fake::new("Spinner", Behavior::SpinUntilCancelled(seen.clone()))],
            config,
        );
        let (features, history) = snapshot();

        let outcome =
            tokio::time::timeout(Duration::from_millis(50), pool.run_all(features, history)).await;
        assert!(outcome.is_err());

        for _ in 0..100 {
            if seen.load(std::sync::atomic::Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen.load(std::sync::atomic::Ordering::SeqCst));
    }

    struct Flat;

    impl SequencePredictor for Flat {
        fn predict_sequence(&self, _window: &[Vec<f32>]) -> Result<f32, String> {
            Ok(0.5)
        }

        fn sequence_length(&self) -> usize {
            30
        }

        fn name(&self) -> &str {
            "flat"
        }
    }

    fn slow_model(load_time: Duration) -> Arc<LazyModel<Box<dyn SequencePredictor>>> {
        Arc::new(LazyModel::new("LSTM", move || {
            std::thread::sleep(load_time);
            Ok(Box::new(Flat) as Box<dyn SequencePredictor>)
        }))
    }

    fn sequence_pool(model: Arc<LazyModel<Box<dyn SequencePredictor>>>) -> StrategyPool {
        let registry = StrategyRegistry::new()
            .with(Arc::new(SequenceModelStrategy::new(model)))
            .unwrap();
        StrategyPool::new(registry, fast_config())
    }

    #[tokio::test]
    async fn test_warm_up_and_wait_returns_once_model_is_ready() {
        let model = slow_model(Duration::from_millis(100));
        let pool = sequence_pool(model.clone());

        assert!(pool.warm_up_and_wait(Duration::from_secs(5)).await);
        assert_eq!(model.state(), ModelState::Ready);
    }

    #[tokio::test]
    async fn test_warm_up_wait_is_bounded() {
        let model = slow_model(Duration::from_millis(2000));
        let pool = sequence_pool(model.clone());

        // The 1s pool deadline caps the requested 10s wait.
        let started = std::time::Instant::now();
        assert!(!pool.warm_up_and_wait(Duration::from_secs(10)).await);
        assert!(started.elapsed() < Duration::from_millis(1900));
        assert_eq!(model.state(), ModelState::Loading);
    }

    #[tokio::test]
    async fn test_failed_load_counts_as_settled() {
        let model: LazyModel<Box<dyn SequencePredictor>> =
            LazyModel::new("LSTM", || anyhow::bail!("missing model file"));
        let model = Arc::new(model);
        let pool = sequence_pool(model.clone());

        assert!(pool.warm_up_and_wait(Duration::from_secs(5)).await);
        assert_eq!(model.state(), ModelState::LoadFailed);
    }
}
