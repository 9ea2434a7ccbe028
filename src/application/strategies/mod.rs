mod boosted;
mod forest;
mod linear;
mod neighbors;
mod sequence;
pub mod statistical;
pub mod strategy_factory;
mod support_vector;
mod technical;
pub mod training;
mod traits;

pub use boosted::{BoostingConfig, GradientBoostingStrategy};
pub use forest::RandomForestStrategy;
pub use linear::{LinearModelStrategy, Penalty};
pub use neighbors::NearestNeighborsStrategy;
pub use sequence::{SEQUENCE_FEATURES, SequenceModelStrategy, SharedSequenceModel};
pub use statistical::{AutoregressiveStrategy, ExponentialSmoothingStrategy};
pub use strategy_factory::{StrategyFactory, StrategyRegistry};
pub use support_vector::SupportVectorStrategy;
pub use technical::{
    BollingerReversionStrategy, MovingAverageCrossoverStrategy, RsiReversalStrategy,
};
pub use traits::{CancelFlag, CancelOnDrop, PriceStrategy, StrategyContext};
