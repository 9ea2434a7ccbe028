//! Push-based observability for Stockcast
//!
//! Metrics are collected in a Prometheus registry and rendered as text on demand.
//! No HTTP server is started.

pub mod metrics;

pub use metrics::ForecastMetrics;
