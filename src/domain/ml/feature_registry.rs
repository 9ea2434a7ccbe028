use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every indicator a `FeatureVector` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Open,
    High,
    Low,
    Close,
    Volume,
    Ma10,
    Ma50,
    Ma200,
    Rsi,
    Macd,
    SignalLine,
    BbUpper,
    BbLower,
    Volatility,
}

/// Ordered list of feature names.
/// This order is the canonical column order for every model input and for serialized
/// snapshots. Any change here is a breaking change for persisted ONNX models.
pub const FEATURE_NAMES: &[&str] = &[
    "open",
    "high",
    "low",
    "close",
    "volume",
    "ma_10",
    "ma_50",
    "ma_200",
    "rsi",
    "macd",
    "signal_line",
    "bb_upper",
    "bb_lower",
    "volatility",
];

pub const ALL_FEATURES: &[Feature] = &[
    Feature::Open,
    Feature::High,
    Feature::Low,
    Feature::Close,
    Feature::Volume,
    Feature::Ma10,
    Feature::Ma50,
    Feature::Ma200,
    Feature::Rsi,
    Feature::Macd,
    Feature::SignalLine,
    Feature::BbUpper,
    Feature::BbLower,
    Feature::Volatility,
];

/// Inputs of the regression strategies. The target is always the next close.
pub const TRAINING_FEATURES: &[Feature] = &[
    Feature::Open,
    Feature::High,
    Feature::Low,
    Feature::Volume,
    Feature::Ma10,
    Feature::Ma50,
    Feature::Ma200,
    Feature::Rsi,
    Feature::Macd,
    Feature::Volatility,
];

/// Inputs of the regime clustering.
pub const CLUSTER_FEATURES: &[Feature] = &[
    Feature::Rsi,
    Feature::Macd,
    Feature::Volatility,
    Feature::Ma50,
    Feature::Volume,
];

impl Feature {
    pub fn as_str(&self) -> &'static str {
        FEATURE_NAMES[self.index()]
    }

    /// Position of this feature in `FEATURE_NAMES`.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        ALL_FEATURES
            .iter()
            .copied()
            .find(|f| f.as_str() == needle)
            .ok_or_else(|| anyhow::anyhow!("Unknown feature: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_names_align_with_enum() {
        assert_eq!(FEATURE_NAMES.len(), ALL_FEATURES.len());
        for (i, feature) in ALL_FEATURES.iter().enumerate() {
            assert_eq!(feature.index(), i);
            assert_eq!(feature.as_str(), FEATURE_NAMES[i]);
        }
    }

    #[test]
    fn test_feature_from_str() {
        assert_eq!("MA_50".parse::<Feature>().unwrap(), Feature::Ma50);
        assert_eq!(" rsi ".parse::<Feature>().unwrap(), Feature::Rsi);
        assert!("adx".parse::<Feature>().is_err());
    }

    #[test]
    fn test_training_features_exclude_target() {
        assert!(!TRAINING_FEATURES.contains(&Feature::Close));
    }
}
