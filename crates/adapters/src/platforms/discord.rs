//! Discord incoming-webhook sender

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};

use crate::http::{self, DEFAULT_TIMEOUT};

/// The webhook URL embeds its token, so it is held as a secret
pub struct DiscordSender {
    client: Client,
    webhook_url: SecretString,
    username: Option<String>,
    max_chars: usize,
}

impl DiscordSender {
    pub fn new(webhook_url: SecretString) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::build_client(DEFAULT_TIMEOUT)?,
            webhook_url,
            username: None,
            max_chars: Platform::Discord.default_max_chars(),
        })
    }

    /// Override the display name configured on the webhook
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[derive(Serialize)]
struct WebhookRequest<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Deserialize)]
struct WebhookMessage {
    id: String,
}

#[async_trait]
impl Publisher for DiscordSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        http::ensure_fits(post, self.max_chars)?;

        // wait=true makes Discord return the created message instead of 204
        let response = self
            .client
            .post(self.webhook_url.expose_secret())
            .query(&[("wait", "true")])
            .json(&WebhookRequest {
                content: &post.text,
                username: self.username.as_deref(),
            })
            .send()
            .await
            .map_err(http::transport_error)?;

        let message: WebhookMessage = http::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        Ok(SendReceipt {
            id: message.id,
            url: None,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Discord
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}
