use crate::config::TelegramConfig;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    disable_web_page_preview: bool,
}

/// Telegram bot notifier. Without credentials every send is a no-op.
pub struct TelegramNotifier {
    client: reqwest::Client,
    config: Option<TelegramConfig>,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(config: Option<TelegramConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            config,
            api_base: TELEGRAM_API.to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// Returns whether Telegram accepted the message. Failures are logged, never raised.
    pub async fn send(&self, text: &str) -> bool {
        let Some(config) = &self.config else {
            debug!("telegram not configured, skipping notification");
            return false;
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, config.bot_token);
        let body = SendMessage {
            chat_id: &config.chat_id,
            text,
            disable_web_page_preview: true,
        };

        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!("⚠️ Telegram rejected message: {}", response.status());
                false
            }
            Err(e) => {
                warn!("⚠️ Telegram send failed: {}", e);
                false
            }
        }
    }
}
