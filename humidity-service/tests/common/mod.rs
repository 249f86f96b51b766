#![allow(dead_code)]

use humidity_service::config::{
    AlertConfig, ExpoConfig, HumidityConfig, ObservabilityConfig, SensorConfig,
    DEFAULT_EXPO_PUSH_URL,
};
use humidity_service::services::{HumidityFetcher, MockPushProvider, SensorClient, TtlCache};
use humidity_service::startup::Application;
use secrecy::Secret;
use service_core::config::Config as CoreConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const DEVICE_TOKEN: &str = "ExponentPushToken[test-device]";

pub fn test_config(sensor_url: &str) -> HumidityConfig {
    HumidityConfig {
        // Use random port for testing (port 0)
        common: CoreConfig { port: 0 },
        sensor: SensorConfig {
            api_url: sensor_url.to_string(),
            timeout_secs: 1,
            cache_ttl_secs: 600,
        },
        expo: ExpoConfig {
            api_url: DEFAULT_EXPO_PUSH_URL.to_string(),
            token: Secret::new(DEVICE_TOKEN.to_string()),
            timeout_secs: 1,
            enabled: false, // Use mock
        },
        alert: AlertConfig {
            threshold: 30.0,
            title: "Alerta de Umidade".to_string(),
            // Long enough that the monitor never ticks during HTTP tests
            check_interval_secs: 3600,
        },
        observability: ObservabilityConfig {
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
    }
}

/// Fetcher pointed at `sensor_url` with its own cache.
pub fn fetcher(sensor_url: &str, ttl: Duration) -> HumidityFetcher {
    let config = test_config(sensor_url);
    let sensor = SensorClient::new(&config.sensor).expect("Failed to build sensor client");
    HumidityFetcher::new(sensor, Arc::new(TtlCache::new(ttl)))
}

/// A URL on localhost where nothing is listening.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind throwaway listener");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/sensor", port)
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub push_provider: Arc<MockPushProvider>,
    shutdown: CancellationToken,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestApp {
    pub async fn spawn(sensor_url: &str) -> Self {
        Self::spawn_with_config(test_config(sensor_url)).await
    }

    pub async fn spawn_with_config(config: HumidityConfig) -> Self {
        let push_provider = Arc::new(MockPushProvider::new(true));

        let app = Application::build_with_push_provider(config, push_provider.clone())
            .await
            .expect("Failed to build test application");

        let port = app.http_port();
        let address = format!("http://127.0.0.1:{}", port);

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle = tokio::spawn(async move {
            app.run_until(async move { token.cancelled().await }).await
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            push_provider,
            shutdown,
            handle,
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        reqwest::Client::new()
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("Application did not shut down in time")
            .expect("Application task panicked")
            .expect("Application returned an error");
    }
}
