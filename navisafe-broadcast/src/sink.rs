//! Event sinks
//!
//! A sink delivers one event to one destination. Sinks report errors, but
//! the broadcaster never retries or surfaces them.

use async_trait::async_trait;
use navisafe_core::TrackingEvent;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Errors from event delivery
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Endpoint returned status {0}")]
    Status(u16),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Destination for tracking events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Sink name for diagnostics
    fn name(&self) -> &str;

    /// Deliver a single event
    async fn deliver(&self, event: &TrackingEvent) -> Result<(), SinkError>;
}

/// Writes every event to the tracing log as JSON
#[derive(Debug, Default, Clone)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn deliver(&self, event: &TrackingEvent) -> Result<(), SinkError> {
        let json = serde_json::to_string(event)?;
        info!("[{}] {} {}", event.channel(), event.subject_id(), json);
        Ok(())
    }
}

/// Posts events as JSON to `<base_url>/<channel>`
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    base_url: String,
}

impl WebhookSink {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SinkError> {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SinkError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SinkError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint for an event's channel
    pub fn endpoint(&self, event: &TrackingEvent) -> String {
        format!("{}/{}", self.base_url, event.channel())
    }
}

#[async_trait]
impl EventSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn deliver(&self, event: &TrackingEvent) -> Result<(), SinkError> {
        let response = self.client.post(self.endpoint(event)).json(event).send().await?;

        if !response.status().is_success() {
            return Err(SinkError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navisafe_core::{AlertKind, Position, SafetyScore};

    #[test]
    fn test_webhook_endpoint() {
        let sink = WebhookSink::new("http://localhost:3001/", 5).unwrap();
        let position = Position::new(0.0, 0.0, None).unwrap();
        let event = TrackingEvent::location_update("s", &position, SafetyScore::MAX, None);
        assert_eq!(sink.endpoint(&event), "http://localhost:3001/location_update");

        let alert = TrackingEvent::alert(
            "s",
            0.0,
            0.0,
            AlertKind::RestrictedZone,
            SafetyScore::MIN,
            "x".to_string(),
            position.timestamp,
        );
        assert_eq!(sink.endpoint(&alert), "http://localhost:3001/safety_alert");
    }

    #[test]
    fn test_webhook_rejects_bad_url() {
        assert!(matches!(
            WebhookSink::new("ws://localhost:3001", 5),
            Err(SinkError::InvalidUrl(_))
        ));
    }

    #[tokio::test]
    async fn test_log_sink_accepts_events() {
        let position = Position::new(1.0, 2.0, None).unwrap();
        let event = TrackingEvent::location_update("s", &position, SafetyScore::MAX, None);
        assert!(LogSink.deliver(&event).await.is_ok());
    }
}
