use crate::config::Config;
use crate::domain::forecast::EnsembleMethod;
use std::env;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::Duration;

// Global lock to prevent race conditions when modifying environment variables in tests
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

const KEYS: &[&str] = &[
    "ENSEMBLE_METHOD",
    "STRATEGY_TIMEOUT_MS",
    "POOL_DEADLINE_MS",
    "TRAINING_WINDOW",
    "MIN_TRAINING_ROWS",
    "MODEL_DIR",
    "LSTM_MODEL_FILE",
    "LSTM_SEQUENCE_LENGTH",
    "DATA_DIR",
    "REGIME_WEIGHTS_PATH",
    "REGIME_CLUSTERS",
    "REGIME_WINDOW",
    "REGIME_MIN_WINDOW",
    "REGIME_SEED",
    "REGIME_N_INIT",
    "OBSERVABILITY_ENABLED",
    "OBSERVABILITY_DUMP_METRICS",
];

fn clear_env() {
    for key in KEYS {
        unsafe { env::remove_var(key) };
    }
}

#[test]
fn test_config_defaults() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.forecast.ensemble_method, EnsembleMethod::EqualWeight);
    assert_eq!(config.forecast.strategy_timeout, Duration::from_secs(5));
    assert_eq!(config.forecast.pool_deadline, Duration::from_secs(15));
    assert_eq!(config.forecast.training_window, 500);
    assert_eq!(
        config.forecast.lstm_model_path(),
        PathBuf::from("models").join("lstm.onnx")
    );
    assert!(config.forecast.regime_weights_path.is_none());
    assert_eq!(config.regime.clusters, 3);
    assert_eq!(config.regime.seed, 42);
    assert!(config.observability.enabled);
}

#[test]
fn test_config_overrides() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    unsafe {
        env::set_var("ENSEMBLE_METHOD", "regime_weighted");
        env::set_var("STRATEGY_TIMEOUT_MS", "250");
        env::set_var("REGIME_CLUSTERS", "4");
        env::set_var("REGIME_SEED", "7");
        env::set_var("REGIME_WEIGHTS_PATH", "weights/regimes.toml");
        env::set_var("OBSERVABILITY_ENABLED", "false");
    }

    let config = Config::from_env().unwrap();

    assert_eq!(
        config.forecast.ensemble_method,
        EnsembleMethod::RegimeWeighted
    );
    assert_eq!(config.forecast.strategy_timeout, Duration::from_millis(250));
    assert_eq!(config.regime.clusters, 4);
    assert_eq!(config.regime.seed, 7);
    assert_eq!(
        config.forecast.regime_weights_path,
        Some(PathBuf::from("weights/regimes.toml"))
    );
    assert!(!config.observability.enabled);

    clear_env();
}

#[test]
fn test_invalid_ensemble_method_is_rejected() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    unsafe { env::set_var("ENSEMBLE_METHOD", "weighted_vote") };

    let err = Config::from_env().unwrap_err();
    assert!(format!("{:#}", err).contains("ENSEMBLE_METHOD"));

    clear_env();
}

#[test]
fn test_regime_min_window_must_fit_window() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    unsafe {
        env::set_var("REGIME_WINDOW", "40");
        env::set_var("REGIME_MIN_WINDOW", "50");
    }

    let err = Config::from_env().unwrap_err();
    assert!(format!("{:#}", err).contains("REGIME_MIN_WINDOW"));

    clear_env();
}

#[test]
fn test_blank_weights_path_is_ignored() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    unsafe { env::set_var("REGIME_WEIGHTS_PATH", "  ") };

    let config = Config::from_env().unwrap();
    assert!(config.forecast.regime_weights_path.is_none());

    clear_env();
}
