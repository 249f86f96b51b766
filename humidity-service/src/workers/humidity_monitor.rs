use crate::services::{
    record_alert, HumidityFetcher, ProviderError, PushMessage, PushProvider,
};
use service_core::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub const ALERT_SOUND: &str = "default";

/// Who gets alerted, and below which humidity.
#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub threshold: f64,
    pub title: String,
    pub device_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Alerted { humidity: f64 },
    Normal { humidity: f64 },
    NoReading,
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("humidity fetch failed: {0}")]
    Fetch(#[from] AppError),

    #[error("push notification failed: {0}")]
    Notify(#[from] ProviderError),
}

/// Periodically re-reads humidity and pushes an alert while it is low.
///
/// Every failure inside a tick is logged and dropped; the loop only ends
/// when the shutdown token is cancelled.
#[derive(Clone)]
pub struct HumidityMonitor {
    fetcher: HumidityFetcher,
    push_provider: Arc<dyn PushProvider>,
    settings: AlertSettings,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl HumidityMonitor {
    pub fn new(
        fetcher: HumidityFetcher,
        push_provider: Arc<dyn PushProvider>,
        settings: AlertSettings,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            push_provider,
            settings,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn alert_message(humidity: f64, threshold: f64) -> String {
        format!(
            "A umidade está em {}%, abaixo do limite de {}%. Hora de regar a planta!",
            humidity, threshold
        )
    }

    /// Run one fetch-and-maybe-notify cycle.
    pub async fn check_once(&self) -> Result<CheckOutcome, MonitorError> {
        let reading = self.fetcher.fetch().await?;

        let Some(humidity) = reading.humidity else {
            return Ok(CheckOutcome::NoReading);
        };

        if !reading.is_below(self.settings.threshold) {
            return Ok(CheckOutcome::Normal { humidity });
        }

        let message = PushMessage {
            device_token: self.settings.device_token.clone(),
            title: self.settings.title.clone(),
            body: Self::alert_message(humidity, self.settings.threshold),
            sound: Some(ALERT_SOUND.to_string()),
        };

        let provider = self.push_provider.name();
        match self.push_provider.send(&message).await {
            Ok(_) => {
                record_alert(provider, "sent");
                Ok(CheckOutcome::Alerted { humidity })
            }
            Err(e) => {
                record_alert(provider, "failed");
                Err(e.into())
            }
        }
    }

    /// Spawn the periodic loop. The first check runs one interval from now.
    pub fn start(&self) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.run().await })
    }

    async fn run(&self) {
        let Some(first_tick) = Instant::now().checked_add(self.interval) else {
            tracing::error!(
                interval_secs = self.interval.as_secs(),
                "Check interval out of range, humidity monitor not started"
            );
            return;
        };
        let mut ticker = interval_at(first_tick, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            threshold = self.settings.threshold,
            push_provider = self.push_provider.name(),
            push_enabled = self.push_provider.is_enabled(),
            "Starting humidity monitor"
        );

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Humidity monitor shutting down");
                    break;
                }
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    async fn tick(&self) {
        match self.check_once().await {
            Ok(CheckOutcome::Alerted { humidity }) => {
                tracing::info!(humidity, "Low humidity alert sent");
            }
            Ok(CheckOutcome::Normal { humidity }) => {
                tracing::debug!(humidity, "Humidity above threshold");
            }
            Ok(CheckOutcome::NoReading) => {
                tracing::warn!("Sensor response carried no humidity value");
            }
            Err(e) => {
                tracing::error!(error = %e, "Humidity check failed");
            }
        }
    }

    pub fn shutdown(&self) {
        tracing::info!("Initiating humidity monitor shutdown");
        self.shutdown_token.cancel();
    }
}
