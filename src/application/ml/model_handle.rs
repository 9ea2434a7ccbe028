use crate::domain::forecast::FailureReason;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info};

/// Load state of a heavy model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelState {
    NotLoaded,
    Loading,
    Ready,
    LoadFailed,
}

enum Slot<T> {
    NotLoaded,
    Loading,
    Ready(Arc<T>),
    LoadFailed(String),
}

type Loader<T> = Arc<dyn Fn() -> anyhow::Result<T> + Send + Sync>;

/// Lazily loaded model owned by the strategy pool.
///
/// Transitions `NotLoaded → Loading → Ready | LoadFailed`. Loading runs on a
/// background thread, so callers never block on it: while the model is not `Ready`
/// `get` returns the failure reason matching the current state.
pub struct LazyModel<T> {
    name: String,
    slot: Arc<RwLock<Slot<T>>>,
    loader: Loader<T>,
}

impl<T: Send + Sync + 'static> LazyModel<T> {
    pub fn new<F>(name: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            slot: Arc::new(RwLock::new(Slot::NotLoaded)),
            loader: Arc::new(loader),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ModelState {
        match &*read(&self.slot) {
            Slot::NotLoaded => ModelState::NotLoaded,
            Slot::Loading => ModelState::Loading,
            Slot::Ready(_) => ModelState::Ready,
            Slot::LoadFailed(_) => ModelState::LoadFailed,
        }
    }

    /// Error message of the last failed load
    pub fn load_error(&self) -> Option<String> {
        match &*read(&self.slot) {
            Slot::LoadFailed(e) => Some(e.clone()),
            _ => None,
        }
    }

    /// Kick off a background load. Returns false if a load already started.
    pub fn start_loading(&self) -> bool {
        {
            let mut slot = write(&self.slot);
            if !matches!(*slot, Slot::NotLoaded) {
                return false;
            }
            *slot = Slot::Loading;
        }

        let slot = self.slot.clone();
        let loader = self.loader.clone();
        let name = self.name.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("load-{}", self.name))
            .spawn(move || Self::finish_load(&name, &slot, &loader));

        if let Err(e) = spawned {
            error!("Model [{}]: failed to spawn loader thread: {}", self.name, e);
            *write(&self.slot) = Slot::LoadFailed(e.to_string());
        }
        true
    }

    /// Load on the calling thread (no-op unless `NotLoaded`). Returns the final state.
    pub fn load_now(&self) -> ModelState {
        {
            let mut slot = write(&self.slot);
            if !matches!(*slot, Slot::NotLoaded) {
                drop(slot);
                return self.state();
            }
            *slot = Slot::Loading;
        }
        Self::finish_load(&self.name, &self.slot, &self.loader);
        self.state()
    }

    fn finish_load(name: &str, slot: &RwLock<Slot<T>>, loader: &Loader<T>) {
        info!("Model [{}]: NotLoaded -> Loading", name);
        let next = match loader() {
            Ok(model) => {
                info!("Model [{}]: Loading -> Ready", name);
                Slot::Ready(Arc::new(model))
            }
            Err(e) => {
                error!("Model [{}]: Loading -> LoadFailed ({:#})", name, e);
                Slot::LoadFailed(format!("{:#}", e))
            }
        };
        *write(slot) = next;
    }

    /// The ready model, or the failure a strategy should report right now.
    /// A `NotLoaded` model starts loading in the background.
    pub fn get(&self) -> Result<Arc<T>, FailureReason> {
        let state = match &*read(&self.slot) {
            Slot::Ready(model) => return Ok(model.clone()),
            Slot::Loading => return Err(FailureReason::ModelLoading),
            Slot::LoadFailed(_) => return Err(FailureReason::ModelLoadFailed),
            Slot::NotLoaded => ModelState::NotLoaded,
        };
        debug_assert_eq!(state, ModelState::NotLoaded);
        self.start_loading();
        Err(FailureReason::ModelNotLoaded)
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    fn wait_until_settled<T: Send + Sync + 'static>(model: &LazyModel<T>) -> ModelState {
        for _ in 0..200 {
            let state = model.state();
            if matches!(state, ModelState::Ready | ModelState::LoadFailed) {
                return state;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        model.state()
    }

    #[test]
    fn test_first_get_starts_loading() {
        let model = LazyModel::new("fast", || Ok(42u32));
        assert_eq!(model.state(), ModelState::NotLoaded);
        assert_eq!(model.get().unwrap_err(), FailureReason::ModelNotLoaded);
        assert_eq!(wait_until_settled(&model), ModelState::Ready);
        assert_eq!(*model.get().unwrap(), 42);
    }

    #[test]
    fn test_loading_state_reports_failure_without_blocking() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Mutex::new(release_rx);
        let model = LazyModel::new("slow", move || {
            let _ = release_rx.lock().unwrap().recv();
            Ok("weights".to_string())
        });

        assert!(model.start_loading());
        assert!(!model.start_loading());
        assert_eq!(model.state(), ModelState::Loading);
        assert_eq!(model.get().unwrap_err(), FailureReason::ModelLoading);

        release_tx.send(()).unwrap();
        assert_eq!(wait_until_settled(&model), ModelState::Ready);
    }

    #[test]
    fn test_load_failure_is_sticky() {
        let model: LazyModel<u8> = LazyModel::new("broken", || anyhow::bail!("file missing"));
        assert_eq!(model.load_now(), ModelState::LoadFailed);
        assert_eq!(model.get().unwrap_err(), FailureReason::ModelLoadFailed);
        assert!(model.load_error().unwrap().contains("file missing"));
        assert!(!model.start_loading());
    }
}
