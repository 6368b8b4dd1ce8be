//! LinkedIn UGC posts sender

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};

use crate::http::{self, DEFAULT_TIMEOUT};

pub struct LinkedInSender {
    client: Client,
    access_token: SecretString,
    author_urn: String,
    base_url: String,
    max_chars: usize,
}

impl LinkedInSender {
    /// `person_id` may be a bare member id or a full `urn:li:person:` URN
    pub fn new(access_token: SecretString, person_id: &str) -> reqwest::Result<Self> {
        Self::with_base_url(
            access_token,
            person_id,
            "https://api.linkedin.com".to_string(),
        )
    }

    pub fn with_base_url(
        access_token: SecretString,
        person_id: &str,
        base_url: String,
    ) -> reqwest::Result<Self> {
        let author_urn = if person_id.starts_with("urn:li:") {
            person_id.to_string()
        } else {
            format!("urn:li:person:{}", person_id)
        };

        Ok(Self {
            client: http::build_client(DEFAULT_TIMEOUT)?,
            access_token,
            author_urn,
            base_url,
            max_chars: Platform::LinkedIn.default_max_chars(),
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[derive(Deserialize)]
struct UgcPostResponse {
    id: Option<String>,
}

#[async_trait]
impl Publisher for LinkedInSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        http::ensure_fits(post, self.max_chars)?;

        let body = json!({
            "author": self.author_urn,
            "lifecycleState": "PUBLISHED",
            "specificContent": {
                "com.linkedin.ugc.ShareContent": {
                    "shareCommentary": { "text": post.text },
                    "shareMediaCategory": "NONE"
                }
            },
            "visibility": {
                "com.linkedin.ugc.MemberNetworkVisibility": "PUBLIC"
            }
        });

        let response = self
            .client
            .post(format!("{}/v2/ugcPosts", self.base_url))
            .bearer_auth(self.access_token.expose_secret())
            .header("X-Restli-Protocol-Version", "2.0.0")
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(response).await?;

        let header_id = response
            .headers()
            .get("x-restli-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let id = match header_id {
            Some(id) => id,
            None => response
                .json::<UgcPostResponse>()
                .await
                .ok()
                .and_then(|r| r.id)
                .ok_or_else(|| SendError::Api("LinkedIn returned no post id".to_string()))?,
        };

        Ok(SendReceipt {
            url: Some(format!("https://www.linkedin.com/feed/update/{}", id)),
            id,
        })
    }

    fn platform(&self) -> Platform {
        Platform::LinkedIn
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_daemon_domain::PlatformResult;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_post() -> RenderedPost {
        RenderedPost {
            platform: Platform::LinkedIn,
            text: "Excited to share a new release".to_string(),
            title: None,
        }
    }

    #[test]
    fn test_author_urn_normalization() {
        let token = || SecretString::new("t".into());
        assert_eq!(
            LinkedInSender::new(token(), "abc").unwrap().author_urn,
            "urn:li:person:abc"
        );
        assert_eq!(
            LinkedInSender::new(token(), "urn:li:organization:9")
                .unwrap()
                .author_urn,
            "urn:li:organization:9"
        );
    }

    #[tokio::test]
    async fn test_publish_reads_restli_header() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/ugcPosts"))
            .and(header("X-Restli-Protocol-Version", "2.0.0"))
            .and(header("Authorization", "Bearer li-token"))
            .and(body_partial_json(serde_json::json!({
                "author": "urn:li:person:me",
                "specificContent": {
                    "com.linkedin.ugc.ShareContent": {
                        "shareCommentary": { "text": "Excited to share a new release" }
                    }
                }
            })))
            .respond_with(
                ResponseTemplate::new(201).insert_header("x-restli-id", "urn:li:share:777"),
            )
            .mount(&mock_server)
            .await;

        let sender = LinkedInSender::with_base_url(
            SecretString::new("li-token".into()),
            "me",
            mock_server.uri(),
        )
        .unwrap();

        assert_eq!(
            sender.send(&sample_post()).await,
            PlatformResult::success("https://www.linkedin.com/feed/update/urn:li:share:777")
        );
    }

    #[tokio::test]
    async fn test_publish_falls_back_to_body_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/ugcPosts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "urn:li:share:888"
            })))
            .mount(&mock_server)
            .await;

        let sender = LinkedInSender::with_base_url(
            SecretString::new("li-token".into()),
            "me",
            mock_server.uri(),
        )
        .unwrap();

        let receipt = sender.publish(&sample_post()).await.unwrap();
        assert_eq!(receipt.id, "urn:li:share:888");
    }

    #[tokio::test]
    async fn test_forbidden_is_auth_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v2/ugcPosts"))
            .respond_with(ResponseTemplate::new(403).set_body_string("ACCESS_DENIED"))
            .mount(&mock_server)
            .await;

        let sender = LinkedInSender::with_base_url(
            SecretString::new("li-token".into()),
            "me",
            mock_server.uri(),
        )
        .unwrap();

        assert!(matches!(
            sender.publish(&sample_post()).await,
            Err(SendError::Auth(_))
        ));
    }
}
