//! Mastodon statuses API sender

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};

use crate::http::{self, DEFAULT_TIMEOUT};

pub struct MastodonSender {
    client: Client,
    access_token: SecretString,
    instance_url: String,
    visibility: String,
    max_chars: usize,
}

impl MastodonSender {
    /// `instance_url` is the server root, e.g. `https://mastodon.social`
    pub fn new(access_token: SecretString, instance_url: String) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::build_client(DEFAULT_TIMEOUT)?,
            access_token,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            visibility: "public".to_string(),
            max_chars: Platform::Mastodon.default_max_chars(),
        })
    }

    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.visibility = visibility.into();
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[derive(Serialize)]
struct CreateStatusRequest<'a> {
    status: &'a str,
    visibility: &'a str,
}

#[derive(Deserialize)]
struct Status {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl Publisher for MastodonSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        http::ensure_fits(post, self.max_chars)?;

        let response = self
            .client
            .post(format!("{}/api/v1/statuses", self.instance_url))
            .bearer_auth(self.access_token.expose_secret())
            .json(&CreateStatusRequest {
                status: &post.text,
                visibility: &self.visibility,
            })
            .send()
            .await
            .map_err(http::transport_error)?;

        let status: Status = http::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        Ok(SendReceipt {
            id: status.id,
            url: status.url,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}
