//! Webhook notifications for collection events
//!
//! Posts a JSON payload to every registered webhook that subscribes to the
//! event. Delivery failures are logged and never interrupt collection.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Header carrying the shared secret
const SECRET_HEADER: &str = "X-Webhook-Secret";

/// Per-delivery timeout
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Events a webhook can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventType {
    GameStart,
    GameEnd,
    ObjectiveTaken,
    Error,
    PlayerPerformance,
}

/// A registered webhook endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub url: String,
    /// Sent in the `X-Webhook-Secret` header when set
    pub secret: Option<String>,
    /// Events to deliver; `None` or an empty list means all events
    pub events: Option<Vec<WebhookEventType>>,
}

impl WebhookConfig {
    /// A webhook receiving every event, without a secret
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            secret: None,
            events: None,
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_events(mut self, events: Vec<WebhookEventType>) -> Self {
        self.events = Some(events);
        self
    }

    fn subscribes_to(&self, event_type: WebhookEventType) -> bool {
        match &self.events {
            Some(events) if !events.is_empty() => events.contains(&event_type),
            _ => true,
        }
    }
}

/// Body posted to webhooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: WebhookEventType,
    /// RFC 3339 UTC timestamp of the notification
    pub timestamp: String,
    pub data: Value,
}

impl WebhookPayload {
    pub fn new(event_type: WebhookEventType, data: Value) -> Self {
        Self {
            event_type,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data,
        }
    }
}

/// Reasons a single delivery failed
#[derive(Debug, Error)]
pub enum WebhookError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status
    #[error("Status {status}, Response: {body}")]
    Rejected { status: u16, body: String },
}

/// Fans notifications out to registered webhooks
#[derive(Debug, Clone, Default)]
pub struct WebhookManager {
    http_client: Client,
    webhooks: Vec<WebhookConfig>,
}

impl WebhookManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_webhook(&mut self, config: WebhookConfig) {
        self.webhooks.push(config);
    }

    /// Removes every webhook registered for `url`
    pub fn remove_webhook(&mut self, url: &str) {
        self.webhooks.retain(|w| w.url != url);
    }

    pub fn webhooks(&self) -> &[WebhookConfig] {
        &self.webhooks
    }

    /// Sends `data` to every webhook subscribed to `event_type`
    ///
    /// Failures are logged, never returned.
    ///
    /// # Returns
    /// The number of webhooks that accepted the notification
    pub async fn notify(&self, event_type: WebhookEventType, data: Value) -> usize {
        let payload = &WebhookPayload::new(event_type, data);

        let deliveries = self
            .webhooks
            .iter()
            .filter(|w| w.subscribes_to(event_type))
            .map(|webhook| async move {
                let result = self.deliver(webhook, payload).await;
                if let Err(e) = &result {
                    tracing::warn!(
                        url = %webhook.url,
                        "Webhook notification failed: {}",
                        e
                    );
                }
                result.is_ok()
            });

        join_all(deliveries)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count()
    }

    async fn deliver(
        &self,
        webhook: &WebhookConfig,
        payload: &WebhookPayload,
    ) -> Result<(), WebhookError> {
        let mut request = self
            .http_client
            .post(&webhook.url)
            .timeout(DELIVERY_TIMEOUT)
            .json(payload);
        if let Some(secret) = &webhook.secret {
            request = request.header(SECRET_HEADER, secret);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WebhookError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    pub async fn notify_game_start(&self, game_data: Value) -> usize {
        self.notify(WebhookEventType::GameStart, game_data).await
    }

    pub async fn notify_game_end(&self, game_data: Value) -> usize {
        self.notify(WebhookEventType::GameEnd, game_data).await
    }

    pub async fn notify_objective(&self, objective_data: Value) -> usize {
        self.notify(WebhookEventType::ObjectiveTaken, objective_data).await
    }

    pub async fn notify_error(&self, error_data: Value) -> usize {
        self.notify(WebhookEventType::Error, error_data).await
    }

    pub async fn notify_player_performance(&self, performance_data: Value) -> usize {
        self.notify(WebhookEventType::PlayerPerformance, performance_data)
            .await
    }
}
