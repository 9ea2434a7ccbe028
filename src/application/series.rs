use crate::domain::market::feature_vector::FeatureHistory;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_SERIES_LIMIT: usize = 500;

/// One row of the historical indicator series shown next to a forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub date: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub ma_50: Option<f64>,
}

/// The trailing `limit` periods of `history`, oldest first.
pub fn indicator_series(history: &FeatureHistory, limit: usize) -> Vec<IndicatorPoint> {
    history
        .tail(limit)
        .iter()
        .map(|row| IndicatorPoint {
            date: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            rsi: row.rsi,
            macd: row.macd,
            ma_50: row.ma_50,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::synthetic_history;

    #[test]
    fn test_series_is_trailing_window() {
        let history = synthetic_history(80, 2);
        let series = indicator_series(&history, 30);
        assert_eq!(series.len(), 30);
        assert_eq!(series.last().unwrap().date, history.latest().unwrap().timestamp);
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        // MA_50 is warm by row 49, so all 30 trailing rows carry it.
        assert!(series.iter().all(|p| p.ma_50.is_some()));
    }

    #[test]
    fn test_warm_up_nulls_serialize_as_null() {
        let history = synthetic_history(5, 2);
        let json = serde_json::to_value(indicator_series(&history, 500)).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 5);
        assert!(json[0]["rsi"].is_null());
        assert!(json[0]["close"].is_number());
    }
}
