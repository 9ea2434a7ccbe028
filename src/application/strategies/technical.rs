//! Rule-based strategies that turn a single indicator reading into a price.
//!
//! The RSI and Bollinger rules return the last close unchanged inside their neutral
//! band. The moving-average crossover always moves by the average recent change.

use super::traits::{PriceStrategy, StrategyContext};
use crate::domain::forecast::FailureReason;
use crate::domain::ml::feature_registry::Feature;

/// Fallback relative move when the snapshot carries no volatility reading
const DEFAULT_VOLATILITY: f64 = 0.01;

fn volatility_or_default(ctx: &StrategyContext) -> f64 {
    ctx.features.volatility.unwrap_or(DEFAULT_VOLATILITY)
}

/// MA_10 vs MA_50 crossover. The magnitude is the mean absolute close-to-close
/// change over the last `lookback` periods.
#[derive(Debug, Clone)]
pub struct MovingAverageCrossoverStrategy {
    lookback: usize,
}

impl MovingAverageCrossoverStrategy {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(1),
        }
    }

    fn average_change(&self, closes: &[f64]) -> Option<f64> {
        if closes.len() < self.lookback + 1 {
            return None;
        }
        let recent = &closes[closes.len() - self.lookback - 1..];
        let changes: Vec<f64> = recent
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| w[1] / w[0] - 1.0)
            .collect();
        if changes.len() < self.lookback {
            return None;
        }
        Some(changes.iter().sum::<f64>() / changes.len() as f64)
    }
}

impl Default for MovingAverageCrossoverStrategy {
    fn default() -> Self {
        Self::new(5)
    }
}

impl PriceStrategy for MovingAverageCrossoverStrategy {
    fn name(&self) -> &str {
        "MACrossover"
    }

    fn required_features(&self) -> &[Feature] {
        &[Feature::Close, Feature::Ma10, Feature::Ma50]
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let close = ctx.require(Feature::Close)?;
        let fast = ctx.require(Feature::Ma10)?;
        let slow = ctx.require(Feature::Ma50)?;

        let closes = ctx.history.closes();
        let avg_change = self
            .average_change(&closes)
            .ok_or(FailureReason::InsufficientHistory)?;

        let direction = if fast > slow { 1.0 } else { -1.0 };
        Ok(close * (1.0 + direction * avg_change.abs()))
    }
}

/// RSI mean reversion: oversold bounces, overbought pulls back.
#[derive(Debug, Clone)]
pub struct RsiReversalStrategy {
    oversold: f64,
    overbought: f64,
}

impl RsiReversalStrategy {
    pub fn new(oversold: f64, overbought: f64) -> Self {
        Self {
            oversold,
            overbought,
        }
    }
}

impl Default for RsiReversalStrategy {
    fn default() -> Self {
        Self::new(30.0, 70.0)
    }
}

impl PriceStrategy for RsiReversalStrategy {
    fn name(&self) -> &str {
        "RSIReversal"
    }

    fn required_features(&self) -> &[Feature] {
        &[Feature::Close, Feature::Rsi]
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let close = ctx.require(Feature::Close)?;
        let rsi = ctx.require(Feature::Rsi)?;
        let vol = volatility_or_default(ctx);

        Ok(if rsi < self.oversold {
            close * (1.0 + vol)
        } else if rsi > self.overbought {
            close * (1.0 - vol)
        } else {
            close
        })
    }
}

/// Bollinger band reversion: below the lower band bounces, above the upper pulls back.
#[derive(Debug, Clone, Default)]
pub struct BollingerReversionStrategy;

impl PriceStrategy for BollingerReversionStrategy {
    fn name(&self) -> &str {
        "Bollinger"
    }

    fn required_features(&self) -> &[Feature] {
        &[Feature::Close, Feature::BbUpper, Feature::BbLower]
    }

    fn predict(&self, ctx: &StrategyContext) -> Result<f64, FailureReason> {
        let close = ctx.require(Feature::Close)?;
        let lower = ctx.require(Feature::BbLower)?;
        let upper = ctx.require(Feature::BbUpper)?;
        let vol = volatility_or_default(ctx);

        Ok(if close < lower {
            close * (1.0 + vol)
        } else if close > upper {
            close * (1.0 - vol)
        } else {
            close
        })
    }
}
