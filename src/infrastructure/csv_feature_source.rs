use crate::domain::market::bar::Bar;
use crate::domain::market::feature_vector::FeatureHistory;
use crate::domain::market::interval::Interval;
use crate::domain::ports::FeatureSource;
use crate::infrastructure::indicators::compute_features;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct CsvBar {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

/// Feature source backed by `{data_dir}/{SYMBOL}_{interval}.csv` OHLCV files with a
/// `date,open,high,low,close,volume` header.
#[derive(Debug, Clone)]
pub struct CsvFeatureSource {
    data_dir: PathBuf,
}

impl CsvFeatureSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.data_dir
            .join(format!("{}_{}.csv", symbol.trim().to_uppercase(), interval.as_str()))
    }

    /// Valid bars in time order. Malformed or inconsistent rows are skipped.
    pub fn read_bars(path: &Path) -> Result<Vec<Bar>> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let mut bars = Vec::new();
        for (line, record) in reader.deserialize::<CsvBar>().enumerate() {
            let row = match record {
                Ok(row) => row,
                Err(e) => {
                    warn!("{}: skipping row {}: {}", path.display(), line + 2, e);
                    continue;
                }
            };
            let Some(timestamp) = parse_timestamp(&row.date) else {
                warn!("{}: skipping row {}: bad date '{}'", path.display(), line + 2, row.date);
                continue;
            };
            let bar = Bar::new(timestamp, row.open, row.high, row.low, row.close, row.volume);
            if bar.is_valid() {
                bars.push(bar);
            } else {
                warn!("{}: skipping inconsistent bar at row {}", path.display(), line + 2);
            }
        }

        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

#[async_trait]
impl FeatureSource for CsvFeatureSource {
    async fn load_history(&self, symbol: &str, interval: Interval) -> Result<FeatureHistory> {
        let path = self.path_for(symbol, interval);
        if !path.exists() {
            debug!("No bar file at {}", path.display());
            return Ok(FeatureHistory::default());
        }

        let bars = tokio::task::spawn_blocking(move || Self::read_bars(&path))
            .await
            .context("Bar reader task failed")??;
        debug!("Loaded {} bars for {} {}", bars.len(), symbol, interval);
        compute_features(&bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, body: &str) {
        let mut file = std::fs::File::create(dir.join(name)).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn test_timestamp_formats() {
        assert!(parse_timestamp("2024-05-01").is_some());
        assert!(parse_timestamp("2024-05-01 15:30:00").is_some());
        assert!(parse_timestamp("2024-05-01T15:30:00Z").is_some());
        assert!(parse_timestamp("01/05/2024").is_none());
    }

    #[tokio::test]
    async fn test_loads_sorted_valid_rows() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "AAPL_1d.csv",
            "date,open,high,low,close,volume\n\
             2024-01-03,11,12,10,11.5,1000\n\
             2024-01-02,10,11,9,10.5,1000\n\
             2024-01-04,oops,12,10,11,1000\n\
             2024-01-05,11,10,12,11,1000\n",
        );

        let source = CsvFeatureSource::new(dir.path());
        let history = source.load_history("aapl", Interval::OneDay).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.rows()[0].close, Some(10.5));
        assert_eq!(history.latest().unwrap().close, Some(11.5));
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvFeatureSource::new(dir.path());
        let history = source.load_history("MSFT", Interval::OneHour).await.unwrap();
        assert!(history.is_empty());
        assert!(source.path_for("msft", Interval::OneHour).ends_with("MSFT_1h.csv"));
    }
}
