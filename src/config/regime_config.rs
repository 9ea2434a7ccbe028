//! Regime clustering configuration parsing from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Regime environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeEnvConfig {
    pub clusters: usize,
    /// Trailing observations clustered per request
    pub window: usize,
    /// Complete observations required before clustering is attempted
    pub min_window: usize,
    pub seed: u64,
    /// Independent k-means restarts; the lowest inertia wins
    pub n_init: usize,
}

impl Default for RegimeEnvConfig {
    fn default() -> Self {
        Self {
            clusters: 3,
            window: 500,
            min_window: 50,
            seed: 42,
            n_init: 10,
        }
    }
}

impl RegimeEnvConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            clusters: Self::parse_usize("REGIME_CLUSTERS", 3)?,
            window: Self::parse_usize("REGIME_WINDOW", 500)?,
            min_window: Self::parse_usize("REGIME_MIN_WINDOW", 50)?,
            seed: env::var("REGIME_SEED")
                .unwrap_or_else(|_| "42".to_string())
                .parse::<u64>()
                .context("Failed to parse REGIME_SEED")?,
            n_init: Self::parse_usize("REGIME_N_INIT", 10)?,
        };

        if config.clusters < 2 {
            anyhow::bail!("REGIME_CLUSTERS must be at least 2, got {}", config.clusters);
        }
        if config.n_init == 0 {
            anyhow::bail!("REGIME_N_INIT must be at least 1");
        }
        if config.min_window < config.clusters || config.min_window > config.window {
            anyhow::bail!(
                "REGIME_MIN_WINDOW ({}) must be between REGIME_CLUSTERS ({}) and REGIME_WINDOW ({})",
                config.min_window,
                config.clusters,
                config.window
            );
        }
        Ok(config)
    }

    fn parse_usize(key: &str, default: usize) -> Result<usize> {
        env::var(key)
            .unwrap_or_else(|_| default.to_string())
            .parse::<usize>()
            .context(format!("Failed to parse {}", key))
    }
}
