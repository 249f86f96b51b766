//! Sensor API client and the cache-fronted fetcher built on it.

use crate::config::SensorConfig;
use crate::models::HumidityReading;
use crate::services::cache::{TtlCache, HUMIDITY_CACHE_KEY};
use crate::services::metrics::{record_cache_hit, record_upstream_request};
use reqwest::{redirect, Client};
use service_core::error::AppError;
use service_core::observability::TracedClientExt;
use std::sync::Arc;

/// HTTP client for the external humidity endpoint.
#[derive(Clone)]
pub struct SensorClient {
    client: Client,
    api_url: String,
}

impl SensorClient {
    pub fn new(config: &SensorConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    /// GET the sensor endpoint and decode its JSON body.
    ///
    /// Redirects are not followed: 3xx, 4xx and 5xx responses become
    /// [`AppError::UpstreamStatus`] with the same status. Failures before a
    /// response arrives (refused, timed out) become
    /// [`AppError::ServiceUnavailable`].
    pub async fn fetch_reading(&self) -> Result<HumidityReading, AppError> {
        let response = self
            .client
            .traced_get(&self.api_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %self.api_url, error = %e, "Sensor API unreachable");
                record_upstream_request("unreachable");
                AppError::ServiceUnavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url = %self.api_url,
                status = status.as_u16(),
                "Sensor API returned error status"
            );
            record_upstream_request("http_error");
            return Err(AppError::UpstreamStatus(status));
        }

        let reading = response.json::<HumidityReading>().await.map_err(|e| {
            if e.is_decode() {
                tracing::warn!(url = %self.api_url, error = %e, "Sensor API returned invalid body");
                record_upstream_request("invalid_body");
                AppError::BadGateway(format!("invalid sensor response: {}", e))
            } else {
                tracing::warn!(url = %self.api_url, error = %e, "Sensor API body read failed");
                record_upstream_request("unreachable");
                AppError::ServiceUnavailable
            }
        })?;

        record_upstream_request("ok");
        tracing::debug!(humidity = ?reading.humidity, "Fetched humidity from sensor API");

        Ok(reading)
    }
}

/// Returns the cached reading while it is fresh, otherwise asks the sensor
/// and caches the answer. Errors are never cached.
#[derive(Clone)]
pub struct HumidityFetcher {
    sensor: SensorClient,
    cache: Arc<TtlCache<HumidityReading>>,
}

impl HumidityFetcher {
    pub fn new(sensor: SensorClient, cache: Arc<TtlCache<HumidityReading>>) -> Self {
        Self { sensor, cache }
    }

    pub fn cache(&self) -> &Arc<TtlCache<HumidityReading>> {
        &self.cache
    }

    pub async fn fetch(&self) -> Result<HumidityReading, AppError> {
        if let Some(reading) = self.cache.get(HUMIDITY_CACHE_KEY) {
            record_cache_hit();
            return Ok(reading);
        }

        let reading = self.sensor.fetch_reading().await?;
        self.cache.set(HUMIDITY_CACHE_KEY, reading.clone());

        Ok(reading)
    }
}
