//! Dev.to (Forem) articles sender

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};

use crate::http::{self, DEFAULT_TIMEOUT};

/// Forem accepts at most this many tags per article
pub const MAX_TAGS: usize = 4;

pub struct DevToSender {
    client: Client,
    api_key: SecretString,
    base_url: String,
    tags: Vec<String>,
    published: bool,
    max_chars: usize,
}

impl DevToSender {
    pub fn new(api_key: SecretString) -> reqwest::Result<Self> {
        Self::with_base_url(api_key, "https://dev.to".to_string())
    }

    pub fn with_base_url(api_key: SecretString, base_url: String) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::build_client(DEFAULT_TIMEOUT)?,
            api_key,
            base_url,
            tags: Vec::new(),
            published: true,
            max_chars: Platform::DevTo.default_max_chars(),
        })
    }

    /// Tags are lowercased, stripped of non-alphanumerics, and capped at [`MAX_TAGS`]
    pub fn with_tags(mut self, tags: &[String]) -> Self {
        self.tags = tags
            .iter()
            .map(|t| {
                t.chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase()
            })
            .filter(|t| !t.is_empty())
            .take(MAX_TAGS)
            .collect();
        self
    }

    /// Create drafts instead of published articles
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[derive(Serialize)]
struct CreateArticleRequest<'a> {
    article: Article<'a>,
}

#[derive(Serialize)]
struct Article<'a> {
    title: &'a str,
    body_markdown: &'a str,
    published: bool,
    tags: &'a [String],
}

#[derive(Deserialize)]
struct CreatedArticle {
    id: u64,
    url: Option<String>,
}

#[async_trait]
impl Publisher for DevToSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        http::ensure_fits(post, self.max_chars)?;

        let title = post
            .title
            .as_deref()
            .ok_or_else(|| SendError::Api("Dev.to articles need a title".to_string()))?;

        let response = self
            .client
            .post(format!("{}/api/articles", self.base_url))
            .header("api-key", self.api_key.expose_secret())
            .json(&CreateArticleRequest {
                article: Article {
                    title,
                    body_markdown: &post.text,
                    published: self.published,
                    tags: &self.tags,
                },
            })
            .send()
            .await
            .map_err(http::transport_error)?;

        let article: CreatedArticle = http::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        Ok(SendReceipt {
            id: article.id.to_string(),
            url: article.url,
        })
    }

    fn platform(&self) -> Platform {
        Platform::DevTo
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}
