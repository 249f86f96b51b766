pub mod cache;
pub mod metrics;
pub mod providers;
pub mod sensor;

pub use cache::{TtlCache, HUMIDITY_CACHE_KEY};
pub use metrics::{get_metrics, init_metrics, record_alert, record_cache_hit, record_upstream_request};
pub use providers::{
    ExpoProvider, MockPushProvider, ProviderError, ProviderResponse, PushMessage, PushProvider,
};
pub use sensor::{HumidityFetcher, SensorClient};
