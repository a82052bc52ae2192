use crate::domain::detection::Detection;
use crate::domain::errors::SinkError;
use crate::domain::ports::AlertSink;
use crate::infrastructure::sinks::message::format_alert;
use crate::infrastructure::sinks::redacted_send_error;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    username: &'a str,
    content: String,
}

/// Posts alerts to a Discord webhook
pub struct DiscordSink {
    client: ClientWithMiddleware,
    webhook_url: String,
}

impl DiscordSink {
    pub fn new(client: ClientWithMiddleware, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl AlertSink for DiscordSink {
    fn name(&self) -> &str {
        "discord"
    }

    async fn notify(&self, detection: &Detection) -> Result<(), SinkError> {
        let payload = WebhookPayload {
            username: "Resonance",
            content: format_alert(detection),
        };

        let response = self
            .client
            .post(&self.webhook_url)
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&payload)?)
            .send()
            .await
            .map_err(|e| redacted_send_error(e, &self.webhook_url))?;

        let status = response.status();
        if status.is_success() {
            debug!("DiscordSink: delivered {}", detection.id);
            Ok(())
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}
