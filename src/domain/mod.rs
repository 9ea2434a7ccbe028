// Per-request forecast values
pub mod forecast;

// Market snapshot domain
pub mod market;

// Model input layout
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
