//! Time-series models fitted on the close series alone.

mod autoregressive;
mod exponential_smoothing;

pub use autoregressive::AutoregressiveStrategy;
pub use exponential_smoothing::ExponentialSmoothingStrategy;
