//! HTTP handlers for humidity-service.

pub mod health;
pub mod humidity;
pub mod metrics;

pub use health::health_check;
pub use humidity::get_humidity;
pub use metrics::metrics_endpoint;
