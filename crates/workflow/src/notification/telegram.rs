//! Telegram Bot API transport.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ChatChannel;
use crate::error::{Result, WorkflowError};

const PARSE_MODE: &str = "HTML";

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends chat messages through the Telegram Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramChannel {
    client: reqwest::Client,
    endpoint: String,
}

impl TelegramChannel {
    /// Builds a channel for the bot `token` against `api_url`
    /// (normally `https://api.telegram.org`).
    pub fn new(api_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: send_message_url(api_url, token),
        })
    }
}

// The endpoint embeds the bot token.
impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel").finish_non_exhaustive()
    }
}

fn send_message_url(api_url: &str, token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_url.trim_end_matches('/'), token)
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    #[tracing::instrument(level = "debug", skip(self, text))]
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&SendMessageRequest {
                chat_id,
                text,
                parse_mode: PARSE_MODE,
            })
            .send()
            .await?;

        let status = response.status();
        let body: ApiResponse = response.json().await?;
        if !status.is_success() || !body.ok {
            return Err(WorkflowError::ChatRejected {
                chat_id,
                reason: body.description.unwrap_or_else(|| status.to_string()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_bot_token() {
        assert_eq!(
            send_message_url("https://api.telegram.org/", "123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[test]
    fn request_body_uses_html_mode() {
        let body = serde_json::to_value(SendMessageRequest {
            chat_id: 42,
            text: "<b>hi</b>",
            parse_mode: PARSE_MODE,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "chat_id": 42, "text": "<b>hi</b>", "parse_mode": "HTML" })
        );
    }

    #[test]
    fn debug_output_hides_the_token() {
        let channel =
            TelegramChannel::new("https://api.telegram.org", "secret", Duration::from_secs(5))
                .unwrap();
        assert!(!format!("{channel:?}").contains("secret"));
    }
}
