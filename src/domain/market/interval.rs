use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar interval a forecast is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m")]
    FiveMin,
    #[serde(rename = "15m")]
    FifteenMin,
    #[serde(rename = "30m")]
    ThirtyMin,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHour,
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1wk")]
    OneWeek,
    #[serde(rename = "1mo")]
    OneMonth,
}

impl Interval {
    /// Nominal duration of this interval in minutes (a month counts as 30 days)
    pub fn to_minutes(&self) -> usize {
        match self {
            Interval::FiveMin => 5,
            Interval::FifteenMin => 15,
            Interval::ThirtyMin => 30,
            Interval::OneHour => 60,
            Interval::FourHour => 240,
            Interval::OneDay => 1440,
            Interval::OneWeek => 10_080,
            Interval::OneMonth => 43_200,
        }
    }

    /// Returns the duration in seconds
    pub fn to_seconds(&self) -> i64 {
        (self.to_minutes() * 60) as i64
    }

    /// Canonical short code, as accepted on the command line and in file names
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::FiveMin => "5m",
            Interval::FifteenMin => "15m",
            Interval::ThirtyMin => "30m",
            Interval::OneHour => "1h",
            Interval::FourHour => "4h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }

    /// Returns all available intervals in ascending order
    pub fn all() -> Vec<Interval> {
        vec![
            Interval::FiveMin,
            Interval::FifteenMin,
            Interval::ThirtyMin,
            Interval::OneHour,
            Interval::FourHour,
            Interval::OneDay,
            Interval::OneWeek,
            Interval::OneMonth,
        ]
    }

    pub fn is_intraday(&self) -> bool {
        self.to_minutes() < Interval::OneDay.to_minutes()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "5m" | "5min" => Ok(Interval::FiveMin),
            "15m" | "15min" => Ok(Interval::FifteenMin),
            "30m" | "30min" => Ok(Interval::ThirtyMin),
            "1h" | "60m" | "1hour" => Ok(Interval::OneHour),
            "4h" | "4hour" => Ok(Interval::FourHour),
            "1d" | "1day" => Ok(Interval::OneDay),
            "1wk" | "1w" => Ok(Interval::OneWeek),
            "1mo" | "1month" => Ok(Interval::OneMonth),
            _ => Err(anyhow!(
                "Invalid interval: {}. Must be one of 5m, 15m, 30m, 1h, 4h, 1d, 1wk, 1mo",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_round_trip_codes() {
        for interval in Interval::all() {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
    }

    #[test]
    fn test_interval_aliases() {
        assert_eq!("60m".parse::<Interval>().unwrap(), Interval::OneHour);
        assert_eq!("1D".parse::<Interval>().unwrap(), Interval::OneDay);
        assert!("2h".parse::<Interval>().is_err());
    }

    #[test]
    fn test_ordering_and_intraday() {
        let all = Interval::all();
        for pair in all.windows(2) {
            assert!(pair[0].to_minutes() < pair[1].to_minutes());
        }
        assert!(Interval::FourHour.is_intraday());
        assert!(!Interval::OneDay.is_intraday());
        assert_eq!(Interval::OneHour.to_seconds(), 3600);
    }
}
