pub mod csv_feature_source;
pub mod indicators;
pub mod mock;
pub mod observability;

pub use csv_feature_source::CsvFeatureSource;
pub use mock::InMemoryFeatureSource;
