use crate::domain::forecast::{FailureReason, StrategyRole};
use crate::domain::market::feature_vector::{FeatureHistory, FeatureVector};
use crate::domain::ml::feature_registry::Feature;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation shared between the pool and a running strategy.
///
/// A flag is cancelled when it, or the pool-level flag it was derived from, is raised.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    own: Arc<AtomicBool>,
    parent: Option<Arc<AtomicBool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag raised either directly or through `self`.
    pub fn child(&self) -> Self {
        Self {
            own: Arc::new(AtomicBool::new(false)),
            parent: Some(self.own.clone()),
        }
    }

    pub fn cancel(&self) {
        self.own.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.own.load(Ordering::SeqCst)
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.load(Ordering::SeqCst))
    }

    /// `Err(Cancelled)` once cancelled, for use with `?` inside long loops.
    pub fn check(&self) -> Result<(), FailureReason> {
        if self.is_cancelled() {
            Err(FailureReason::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Raises the flag when the returned guard is dropped.
    pub fn guard(&self) -> CancelOnDrop {
        CancelOnDrop(self.clone())
    }
}

pub struct CancelOnDrop(CancelFlag);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Read-only inputs handed to every strategy of one request.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    /// Most recent indicator snapshot
    pub features: Arc<FeatureVector>,
    pub history: Arc<FeatureHistory>,
    /// Trailing rows a fitted model may train on
    pub training_window: usize,
    /// Minimum usable rows before a fitted model refuses to guess
    pub min_training_rows: usize,
    pub cancel: CancelFlag,
}

impl StrategyContext {
    pub fn new(features: Arc<FeatureVector>, history: Arc<FeatureHistory>) -> Self {
        Self {
            features,
            history,
            training_window: 500,
            min_training_rows: 30,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_training_window(mut self, training_window: usize, min_training_rows: usize) -> Self {
        self.training_window = training_window;
        self.min_training_rows = min_training_rows;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Latest value of `feature`, or `InsufficientFeatures`.
    pub fn require(&self, feature: Feature) -> Result<f64, FailureReason> {
        self.features
            .get(feature)
            .ok_or(FailureReason::InsufficientFeatures)
    }
}

/// A predictor of the next period's close.
///
/// Implementations are pure functions of the context: no shared mutable state, no
/// side effects beyond the returned value. Failures are reported through
/// `FailureReason`, never by panicking (the pool still converts panics).
pub trait PriceStrategy: Send + Sync {
    /// Unique name within a pool
    fn name(&self) -> &str;

    fn role(&self) -> StrategyRole {
        StrategyRole::Auxiliary
    }

    /// Latest-snapshot features that must be non-null before `predict` is called
    fn required_features(&self) -> &[Feature] {
        &[]
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason>;

    /// Start acquiring heavy resources (model files) ahead of the first request
    fn warm_up(&self) {}

    /// Whether warm-up has finished, successfully or not
    fn is_warm(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_flag_follows_parent() {
        let parent = CancelFlag::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        assert!(child.is_cancelled());
        assert_eq!(child.check(), Err(FailureReason::Cancelled));
    }

    #[test]
    fn test_child_cancel_does_not_touch_parent() {
        let parent = CancelFlag::new();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[test]
    fn test_guard_cancels_on_drop() {
        let flag = CancelFlag::new();
        {
            let _guard = flag.guard();
            assert!(!flag.is_cancelled());
        }
        assert!(flag.is_cancelled());
    }
}
