use super::{ProviderError, ProviderResponse, PushMessage, PushProvider};
use crate::config::ExpoConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use service_core::observability::TracedClientExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Sends push notifications through the Expo push gateway.
pub struct ExpoProvider {
    config: ExpoConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ExpoPushRequest<'a> {
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sound: Option<&'a str>,
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Deserialize)]
struct ExpoPushResponse {
    data: Option<ExpoPushTicket>,
    #[serde(default)]
    errors: Vec<ExpoApiError>,
}

#[derive(Debug, Deserialize)]
struct ExpoPushTicket {
    status: String,
    id: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ExpoApiError {
    code: Option<String>,
    message: String,
}

impl ExpoProvider {
    pub fn new(config: ExpoConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::Configuration(format!("HTTP client error: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl PushProvider for ExpoProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "Expo push provider is not enabled".to_string(),
            ));
        }

        if push.device_token.is_empty() {
            return Err(ProviderError::Configuration(
                "Expo device token is not configured".to_string(),
            ));
        }

        let request = ExpoPushRequest {
            to: &push.device_token,
            sound: push.sound.as_deref(),
            title: &push.title,
            body: &push.body,
        };

        let response = self
            .client
            .traced_post(&self.config.api_url)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to connect to Expo: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::SendFailed(format!(
                "Expo API returned error status {}: {}",
                status, body
            )));
        }

        let expo_response: ExpoPushResponse = response.json().await.map_err(|e| {
            ProviderError::SendFailed(format!("Failed to parse Expo response: {}", e))
        })?;

        if let Some(error) = expo_response.errors.first() {
            return Err(ProviderError::SendFailed(format!(
                "Expo error: {}",
                error.message
            )));
        }

        let ticket = expo_response.data.ok_or_else(|| {
            ProviderError::SendFailed("Expo response carried no push ticket".to_string())
        })?;

        if ticket.status != "ok" {
            return Err(ProviderError::SendFailed(format!(
                "Expo ticket status {}: {}",
                ticket.status,
                ticket.message.unwrap_or_default()
            )));
        }

        tracing::info!(
            ticket_id = ?ticket.id,
            title = %push.title,
            "Push notification sent successfully via Expo"
        );

        Ok(ProviderResponse::success(ticket.id))
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn name(&self) -> &'static str {
        "expo"
    }
}

/// Mock push provider for testing and for running without a device token.
pub struct MockPushProvider {
    enabled: bool,
    send_count: AtomicU64,
    sent: Mutex<Vec<PushMessage>>,
}

impl MockPushProvider {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            send_count: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Messages accepted so far, oldest first.
    pub fn sent_messages(&self) -> Vec<PushMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, push: &PushMessage) -> Result<ProviderResponse, ProviderError> {
        if !self.enabled {
            return Err(ProviderError::NotEnabled(
                "Mock push provider is not enabled".to_string(),
            ));
        }

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(push.clone());
        }

        tracing::info!(
            title = %push.title,
            body = %push.body,
            "[MOCK] Push notification would be sent"
        );

        Ok(ProviderResponse::success(Some(format!("mock-push-{}", count))))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
