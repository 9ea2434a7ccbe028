//! Configuration module for Stockcast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Forecast pipeline, Regime clustering, and Observability.

mod forecast_config;
mod observability_config;
mod regime_config;

pub use forecast_config::ForecastEnvConfig;
pub use observability_config::ObservabilityEnvConfig;
pub use regime_config::RegimeEnvConfig;

use anyhow::{Context, Result};

/// Main application configuration.
///
/// Aggregates all sub-configurations loaded from the environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub forecast: ForecastEnvConfig,
    pub regime: RegimeEnvConfig,
    pub observability: ObservabilityEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let forecast = ForecastEnvConfig::from_env().context("Failed to load forecast config")?;
        let regime = RegimeEnvConfig::from_env().context("Failed to load regime config")?;
        let observability = ObservabilityEnvConfig::from_env();

        Ok(Self {
            forecast,
            regime,
            observability,
        })
    }
}
