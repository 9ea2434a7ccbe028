pub mod detector;
pub mod kmeans;
pub mod scaler;

pub use detector::{RegimeConfig, RegimeDetector};
