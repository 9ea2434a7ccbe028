//! Stockcast - next-period close forecasts from an ensemble of strategies
//!
//! # Usage
//! ```sh
//! cargo run -- forecast AAPL --interval 1d
//! cargo run -- forecast AAPL --synthetic 400
//! cargo run -- series AAPL --limit 100
//! ```
//!
//! # Environment Variables
//! - `DATA_DIR` - Directory holding `{SYMBOL}_{interval}.csv` bar files (default: data)
//! - `ENSEMBLE_METHOD` - equal_weight, regime_weighted, median, trimmed_mean, clustered_trimmed_mean
//! - `OBSERVABILITY_DUMP_METRICS` - Print the metrics registry to stderr when done

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use stockcast::application::forecaster::Forecaster;
use stockcast::application::series::DEFAULT_SERIES_LIMIT;
use stockcast::config::Config;
use stockcast::domain::market::interval::Interval;
use stockcast::domain::ports::FeatureSource;
use stockcast::infrastructure::{CsvFeatureSource, InMemoryFeatureSource};
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensemble forecast of the next close
    Forecast {
        symbol: String,

        /// Bar interval (5m, 15m, 30m, 1h, 4h, 1d, 1wk, 1mo)
        #[arg(short, long, default_value = "1d")]
        interval: String,

        /// Use a seeded random walk of this many periods instead of DATA_DIR
        #[arg(long)]
        synthetic: Option<usize>,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
    /// Historical indicator series
    Series {
        symbol: String,

        #[arg(short, long, default_value = "1d")]
        interval: String,

        #[arg(short, long, default_value_t = DEFAULT_SERIES_LIMIT)]
        limit: usize,

        #[arg(long)]
        synthetic: Option<usize>,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays valid JSON
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!(
        "Stockcast {}: method={}, timeout={:?}, deadline={:?}",
        env!("CARGO_PKG_VERSION"),
        config.forecast.ensemble_method,
        config.forecast.strategy_timeout,
        config.forecast.pool_deadline
    );

    let output = match cli.command {
        Commands::Forecast {
            symbol,
            interval,
            synthetic,
            seed,
        } => {
            let interval: Interval = interval.parse()?;
            let forecaster = build(&config, &symbol, interval, synthetic, seed).await?;
            forecaster
                .warm_up_and_wait(config.forecast.pool_deadline)
                .await;
            let response = forecaster.forecast(&symbol, interval).await?;
            dump_metrics(&config, &forecaster);
            serde_json::to_string_pretty(&response)?
        }
        Commands::Series {
            symbol,
            interval,
            limit,
            synthetic,
            seed,
        } => {
            let interval: Interval = interval.parse()?;
            let forecaster = build(&config, &symbol, interval, synthetic, seed).await?;
            let series = forecaster.indicator_series(&symbol, interval, limit).await?;
            serde_json::to_string_pretty(&series)?
        }
    };

    println!("{}", output);
    Ok(())
}

async fn build(
    config: &Config,
    symbol: &str,
    interval: Interval,
    synthetic: Option<usize>,
    seed: u64,
) -> Result<Forecaster> {
    let source: Arc<dyn FeatureSource> = match synthetic {
        Some(periods) => {
            info!("Using {} synthetic periods (seed {})", periods, seed);
            Arc::new(InMemoryFeatureSource::with_synthetic(symbol, interval, periods, seed).await)
        }
        None => {
            info!("Reading bars from {}", config.forecast.data_dir.display());
            Arc::new(CsvFeatureSource::new(config.forecast.data_dir.clone()))
        }
    };
    Forecaster::from_config(config, source)
}

fn dump_metrics(config: &Config, forecaster: &Forecaster) {
    if !config.observability.dump_metrics {
        return;
    }
    if let Some(metrics) = forecaster.metrics() {
        eprintln!("{}", metrics.render());
    }
}
