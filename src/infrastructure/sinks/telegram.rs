use crate::domain::detection::Detection;
use crate::domain::errors::SinkError;
use crate::domain::ports::AlertSink;
use crate::infrastructure::sinks::message::format_alert;
use crate::infrastructure::sinks::redacted_send_error;
use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Serialize;
use tracing::debug;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    disable_web_page_preview: bool,
}

/// Sends alerts through the Telegram Bot API (`sendMessage`)
pub struct TelegramSink {
    client: ClientWithMiddleware,
    base_url: String,
    token: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(
        client: ClientWithMiddleware,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: TELEGRAM_API_URL.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Point the sink at another Bot API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AlertSink for TelegramSink {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, detection: &Detection) -> Result<(), SinkError> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text: format_alert(detection),
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(serde_json::to_string(&request)?)
            .send()
            .await
            .map_err(|e| redacted_send_error(e, &self.token))?;

        let status = response.status();
        if status.is_success() {
            debug!("TelegramSink: delivered {}", detection.id);
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
