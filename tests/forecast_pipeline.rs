use std::sync::Arc;
use std::time::Duration;
use stockcast::application::forecaster::Forecaster;
use stockcast::config::Config;
use stockcast::domain::errors::ForecastError;
use stockcast::domain::forecast::{Direction, EnsembleMethod, FailureReason, ModelReport};
use stockcast::domain::market::interval::Interval;
use stockcast::infrastructure::{CsvFeatureSource, InMemoryFeatureSource};

fn test_config() -> Config {
    let mut config = Config::default();
    // Unoptimized builds fit the tree ensembles slowly
    config.forecast.strategy_timeout = Duration::from_secs(60);
    config.forecast.pool_deadline = Duration::from_secs(120);
    config.forecast.model_dir = "no-such-model-dir".into();
    config
}

async fn synthetic_forecaster(config: &Config, periods: usize) -> Forecaster {
    let source = InMemoryFeatureSource::with_synthetic("AAPL", Interval::OneDay, periods, 42).await;
    Forecaster::from_config(config, Arc::new(source)).unwrap()
}

#[tokio::test]
async fn test_end_to_end_forecast_without_sequence_model() {
    let forecaster = synthetic_forecaster(&test_config(), 400).await;
    let response = forecaster.forecast("AAPL", Interval::OneDay).await.unwrap();

    let details = &response.details;
    assert_eq!(details.models.get("LSTM"), Some(&ModelReport::Failed));
    assert!(matches!(
        details.failed_strategies.get("LSTM"),
        Some(FailureReason::ModelNotLoaded | FailureReason::ModelLoadFailed)
    ));
    assert!(details.models.contains_key("LinearRegression"));
    assert!(details.models.contains_key("XGBoost"));
    assert!(!details.raw_predictions.contains_key("LSTM"));

    assert!(details.num_strategies >= 1);
    assert_eq!(details.num_strategies, details.raw_predictions.len());
    assert_eq!(
        details.num_strategies + details.failed_strategies.len(),
        forecaster.pool().registry().len()
    );

    let current = response.current_price.unwrap();
    let predicted = response.predicted_next_close.unwrap();
    let expected = if predicted >= current {
        Direction::Up
    } else {
        Direction::Down
    };
    assert_eq!(response.direction, expected);
    assert!(response.expected_change_pct.ends_with('%'));

    let weight_sum: f64 = details.weights.values().sum();
    assert!((weight_sum - 1.0).abs() < 1e-9);
    assert!(details.cluster_regime.is_some_and(|r| r < 3));
}

#[tokio::test]
async fn test_forecast_is_deterministic() {
    let config = test_config();
    let a = synthetic_forecaster(&config, 300).await;
    let b = synthetic_forecaster(&config, 300).await;

    let first = serde_json::to_string(&a.forecast("AAPL", Interval::OneDay).await.unwrap()).unwrap();
    let second = serde_json::to_string(&b.forecast("AAPL", Interval::OneDay).await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_short_history_falls_back_to_equal_weight() {
    let mut config = test_config();
    config.forecast.ensemble_method = EnsembleMethod::RegimeWeighted;
    let forecaster = synthetic_forecaster(&config, 60).await;

    let response = forecaster.forecast("AAPL", Interval::OneDay).await.unwrap();
    assert_eq!(response.details.cluster_regime, None);
    assert_eq!(
        response.details.ensemble_method,
        EnsembleMethod::EqualWeightFallback
    );
    // Technical strategies only need the latest snapshot
    assert!(response.details.num_strategies >= 1);
}

#[tokio::test]
async fn test_unknown_symbol_is_no_data() {
    let forecaster = synthetic_forecaster(&test_config(), 60).await;
    let err = forecaster.forecast("ZZZZ", Interval::OneDay).await.unwrap_err();
    assert!(matches!(err, ForecastError::NoData { .. }));
    assert!(!err.is_health_problem());
}

#[tokio::test]
async fn test_csv_source_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("date,open,high,low,close,volume\n");
    for bar in stockcast::infrastructure::mock::synthetic_bars(120, 5) {
        csv.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    std::fs::write(dir.path().join("MSFT_1d.csv"), csv).unwrap();

    let forecaster = Forecaster::from_config(
        &test_config(),
        Arc::new(CsvFeatureSource::new(dir.path())),
    )
    .unwrap();

    let series = forecaster
        .indicator_series("msft", Interval::OneDay, 20)
        .await
        .unwrap();
    assert_eq!(series.len(), 20);
    assert!(series.iter().all(|p| p.rsi.is_some()));

    let response = forecaster.forecast("msft", Interval::OneDay).await.unwrap();
    assert_eq!(response.symbol, "MSFT");
    assert!(response.predicted_next_close.is_some());

    let err = forecaster.forecast("MSFT", Interval::OneHour).await.unwrap_err();
    assert!(matches!(err, ForecastError::NoData { .. }));
}

#[tokio::test]
async fn test_missing_weight_table_fails_construction() {
    let mut config = test_config();
    config.forecast.regime_weights_path = Some("does/not/exist.toml".into());
    let source = InMemoryFeatureSource::new();
    let err = Forecaster::from_config(&config, Arc::new(source)).err().unwrap();
    assert!(format!("{:#}", err).contains("regime weights"));
}
