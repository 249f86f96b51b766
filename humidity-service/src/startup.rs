//! Application startup and lifecycle management.
//!
//! Builds the shared state (cache, sensor fetcher, push provider), the HTTP
//! router, and the humidity monitor, and runs them until a shutdown signal.

use crate::config::HumidityConfig;
use crate::handlers::{get_humidity, health_check, metrics_endpoint};
use crate::services::{
    ExpoProvider, HumidityFetcher, MockPushProvider, PushProvider, SensorClient, TtlCache,
};
use crate::workers::{AlertSettings, HumidityMonitor};
use axum::{middleware::from_fn, routing::get, Router};
use secrecy::ExposeSecret;
use service_core::error::AppError;
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{http_trace_layer, request_id_middleware},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: HumidityFetcher,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_humidity))
        .route("/humidity", get(get_humidity))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .layer(from_fn(metrics_middleware))
        .layer(http_trace_layer())
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Pick the push provider for the configuration: Expo when a device token
/// is configured, otherwise a log-only mock.
fn push_provider_for(config: &HumidityConfig) -> Arc<dyn PushProvider> {
    if !config.expo.enabled {
        tracing::info!("EXPO_TOKEN not set, using mock push provider");
        return Arc::new(MockPushProvider::new(true));
    }

    match ExpoProvider::new(config.expo.clone()) {
        Ok(provider) => {
            tracing::info!("Expo push provider initialized");
            Arc::new(provider)
        }
        Err(e) => {
            tracing::warn!("Failed to initialize Expo provider: {}. Using mock.", e);
            Arc::new(MockPushProvider::new(true))
        }
    }
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
    monitor: HumidityMonitor,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: HumidityConfig) -> Result<Self, AppError> {
        let push_provider = push_provider_for(&config);
        Self::build_with_push_provider(config, push_provider).await
    }

    /// Build with an explicit push provider instead of the configured one.
    pub async fn build_with_push_provider(
        config: HumidityConfig,
        push_provider: Arc<dyn PushProvider>,
    ) -> Result<Self, AppError> {
        let cache = Arc::new(TtlCache::new(config.sensor.cache_ttl()));
        let sensor = SensorClient::new(&config.sensor)?;
        let fetcher = HumidityFetcher::new(sensor, cache);

        let monitor = HumidityMonitor::new(
            fetcher.clone(),
            push_provider,
            AlertSettings {
                threshold: config.alert.threshold,
                title: config.alert.title.clone(),
                device_token: config.expo.token.expose_secret().clone(),
            },
            config.alert.check_interval(),
        );

        let state = AppState { fetcher };

        // Port 0 binds a random port for testing
        let http_addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let http_listener = TcpListener::bind(http_addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", http_addr, e);
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(
            sensor_url = %config.sensor.api_url,
            "Humidity service: HTTP on port {}",
            http_port
        );

        Ok(Self {
            http_port,
            http_listener,
            state,
            monitor,
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Run until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve HTTP and run the humidity monitor until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let monitor_handle = self.monitor.start();
        let router = build_router(self.state);

        let result = axum::serve(self.http_listener, router)
            .with_graceful_shutdown(shutdown)
            .await;

        self.monitor.shutdown();
        if let Err(e) = monitor_handle.await {
            tracing::error!("Humidity monitor task failed: {}", e);
        }

        result.map_err(|e| {
            tracing::error!("HTTP server error: {}", e);
            std::io::Error::other(format!("HTTP server error: {}", e))
        })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
