// Market snapshot domain
pub mod bar;
pub mod feature_vector;
pub mod interval;
pub mod market_regime;
