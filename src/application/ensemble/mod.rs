pub mod aggregator;
pub mod outliers;
pub mod weights;

pub use aggregator::EnsembleAggregator;
pub use weights::RegimeWeightTable;
