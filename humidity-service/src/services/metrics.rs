//! Metrics collection for humidity-service.
//!
//! Counters go through the `metrics` facade; a Prometheus recorder renders
//! them for `GET /metrics`.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            if METRICS_HANDLE.set(handle).is_err() {
                tracing::warn!("Metrics handle already set");
            }
        }
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

pub fn record_cache_hit() {
    counter!("humidity_cache_hits_total").increment(1);
}

/// `outcome` is one of `ok`, `http_error`, `invalid_body`, `unreachable`.
pub fn record_upstream_request(outcome: &'static str) {
    counter!("humidity_upstream_requests_total", "outcome" => outcome).increment(1);
}

/// `provider` is the push provider name (`expo`, `mock`); `outcome` is one
/// of `sent`, `failed`.
pub fn record_alert(provider: &'static str, outcome: &'static str) {
    counter!("humidity_alerts_total", "provider" => provider, "outcome" => outcome).increment(1);
}
