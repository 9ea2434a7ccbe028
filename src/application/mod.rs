pub mod ensemble;
pub mod forecast_assembler;
pub mod forecaster;
pub mod ml;
pub mod regime;
pub mod series;
pub mod strategies;
pub mod strategy_pool;
