//! X (Twitter) API v2 sender

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};

use crate::http::{self, DEFAULT_TIMEOUT};

/// Posts status updates with an OAuth2 user-context bearer token
pub struct TwitterSender {
    client: Client,
    user_token: SecretString,
    base_url: String,
    max_chars: usize,
}

impl TwitterSender {
    pub fn new(user_token: SecretString) -> reqwest::Result<Self> {
        Self::with_base_url(user_token, "https://api.twitter.com".to_string())
    }

    pub fn with_base_url(user_token: SecretString, base_url: String) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::build_client(DEFAULT_TIMEOUT)?,
            user_token,
            base_url,
            max_chars: Platform::Twitter.default_max_chars(),
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[async_trait]
impl Publisher for TwitterSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        http::ensure_fits(post, self.max_chars)?;

        let response = self
            .client
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(self.user_token.expose_secret())
            .json(&CreateTweetRequest { text: &post.text })
            .send()
            .await
            .map_err(http::transport_error)?;

        let tweet: CreateTweetResponse = http::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        // The author handle isn't returned; the /i/ path resolves without it
        Ok(SendReceipt {
            url: Some(format!("https://x.com/i/status/{}", tweet.data.id)),
            id: tweet.data.id,
        })
    }

    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}
