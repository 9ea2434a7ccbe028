//! Forecast pipeline configuration parsing from environment variables.
//!
//! Covers the strategy pool budget, training windows, model files and the
//! aggregation method.

use crate::domain::forecast::EnsembleMethod;
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Forecast environment configuration
#[derive(Debug, Clone)]
pub struct ForecastEnvConfig {
    pub ensemble_method: EnsembleMethod,

    // Strategy pool
    pub strategy_timeout: Duration,
    pub pool_deadline: Duration,
    pub training_window: usize,
    pub min_training_rows: usize,

    // Models
    pub model_dir: PathBuf,
    pub lstm_model_file: String,
    pub lstm_sequence_length: usize,

    // Inputs
    pub data_dir: PathBuf,
    pub regime_weights_path: Option<PathBuf>,
}

impl Default for ForecastEnvConfig {
    fn default() -> Self {
        Self {
            ensemble_method: EnsembleMethod::EqualWeight,
            strategy_timeout: Duration::from_millis(5000),
            pool_deadline: Duration::from_millis(15000),
            training_window: 500,
            min_training_rows: 30,
            model_dir: PathBuf::from("models"),
            lstm_model_file: "lstm.onnx".to_string(),
            lstm_sequence_length: 30,
            data_dir: PathBuf::from("data"),
            regime_weights_path: None,
        }
    }
}

impl ForecastEnvConfig {
    pub fn from_env() -> Result<Self> {
        let method_str = env::var("ENSEMBLE_METHOD").unwrap_or_else(|_| "equal_weight".to_string());
        let ensemble_method = EnsembleMethod::from_str(&method_str)
            .with_context(|| format!("Failed to parse ENSEMBLE_METHOD '{}'", method_str))?;

        let strategy_timeout = Duration::from_millis(Self::parse_u64("STRATEGY_TIMEOUT_MS", 5000)?);
        let pool_deadline = Duration::from_millis(Self::parse_u64("POOL_DEADLINE_MS", 15000)?);
        if strategy_timeout.is_zero() || pool_deadline.is_zero() {
            anyhow::bail!("STRATEGY_TIMEOUT_MS and POOL_DEADLINE_MS must be positive");
        }

        let training_window = Self::parse_usize("TRAINING_WINDOW", 500)?;
        let min_training_rows = Self::parse_usize("MIN_TRAINING_ROWS", 30)?;
        if min_training_rows == 0 || min_training_rows > training_window {
            anyhow::bail!(
                "MIN_TRAINING_ROWS ({}) must be between 1 and TRAINING_WINDOW ({})",
                min_training_rows,
                training_window
            );
        }

        let regime_weights_path = env::var("REGIME_WEIGHTS_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            ensemble_method,
            strategy_timeout,
            pool_deadline,
            training_window,
            min_training_rows,
            model_dir: PathBuf::from(env::var("MODEL_DIR").unwrap_or_else(|_| "models".to_string())),
            lstm_model_file: env::var("LSTM_MODEL_FILE").unwrap_or_else(|_| "lstm.onnx".to_string()),
            lstm_sequence_length: Self::parse_usize("LSTM_SEQUENCE_LENGTH", 30)?,
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string())),
            regime_weights_path,
        })
    }

    pub fn lstm_model_path(&self) -> PathBuf {
        self.model_dir.join(&self.lstm_model_file)
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }

    fn parse_u64(key: &str, default: u64) -> Result<u64> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<u64>()
            .context(format!("Failed to parse {}", key))
    }
}
