//! GitHub issue comment sender

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};

use crate::http::{self, DEFAULT_TIMEOUT};

/// Issue or pull request that receives the comments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

pub struct GithubCommentSender {
    client: Client,
    token: SecretString,
    issue: IssueRef,
    base_url: String,
    max_chars: usize,
}

impl GithubCommentSender {
    pub fn new(token: SecretString, issue: IssueRef) -> reqwest::Result<Self> {
        Self::with_base_url(token, issue, "https://api.github.com".to_string())
    }

    pub fn with_base_url(
        token: SecretString,
        issue: IssueRef,
        base_url: String,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::build_client(DEFAULT_TIMEOUT)?,
            token,
            issue,
            base_url,
            max_chars: Platform::GithubComment.default_max_chars(),
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[derive(Serialize)]
struct CreateCommentRequest<'a> {
    body: &'a str,
}

#[derive(Deserialize)]
struct Comment {
    id: u64,
    html_url: String,
}

#[async_trait]
impl Publisher for GithubCommentSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        http::ensure_fits(post, self.max_chars)?;

        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.base_url, self.issue.owner, self.issue.repo, self.issue.number
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(&CreateCommentRequest { body: &post.text })
            .send()
            .await
            .map_err(http::transport_error)?;

        let comment: Comment = http::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        Ok(SendReceipt {
            id: comment.id.to_string(),
            url: Some(comment.html_url),
        })
    }

    fn platform(&self) -> Platform {
        Platform::GithubComment
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_daemon_domain::PlatformResult;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn issue() -> IssueRef {
        IssueRef {
            owner: "acme".to_string(),
            repo: "widgets".to_string(),
            number: 12,
        }
    }

    fn sample_post() -> RenderedPost {
        RenderedPost {
            platform: Platform::GithubComment,
            text: "Status update from the daemon".to_string(),
            title: None,
        }
    }

    #[tokio::test]
    async fn test_publish_comment() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/repos/acme/widgets/issues/12/comments"))
            .and(header("Authorization", "Bearer gh-token"))
            .and(body_json(serde_json::json!({
                "body": "Status update from the daemon"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 31337,
                "html_url": "https://github.com/acme/widgets/issues/12#issuecomment-31337"
            })))
            .mount(&mock_server)
            .await;

        let sender = GithubCommentSender::with_base_url(
            SecretString::new("gh-token".into()),
            issue(),
            mock_server.uri(),
        )
        .unwrap();

        assert_eq!(
            sender.send(&sample_post()).await,
            PlatformResult::success(
                "https://github.com/acme/widgets/issues/12#issuecomment-31337"
            )
        );
    }

    #[tokio::test]
    async fn test_secondary_rate_limit() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let sender = GithubCommentSender::with_base_url(
            SecretString::new("gh-token".into()),
            issue(),
            mock_server.uri(),
        )
        .unwrap();

        assert!(sender.send(&sample_post()).await.is_rate_limited());
    }

    #[tokio::test]
    async fn test_forbidden_with_exhausted_quota_is_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .insert_header("retry-after", "60")
                    .set_body_string("API rate limit exceeded"),
            )
            .mount(&mock_server)
            .await;

        let sender = GithubCommentSender::with_base_url(
            SecretString::new("gh-token".into()),
            issue(),
            mock_server.uri(),
        )
        .unwrap();

        assert_eq!(
            sender.send(&sample_post()).await,
            PlatformResult::RateLimited {
                retry_after: Some(std::time::Duration::from_secs(60))
            }
        );
    }

    #[tokio::test]
    async fn test_plain_forbidden_is_auth_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403).set_body_string("Resource not accessible by integration"),
            )
            .mount(&mock_server)
            .await;

        let sender = GithubCommentSender::with_base_url(
            SecretString::new("gh-token".into()),
            issue(),
            mock_server.uri(),
        )
        .unwrap();

        assert!(matches!(
            sender.send(&sample_post()).await,
            PlatformResult::Failed { ref detail } if detail.starts_with("Authentication failed")
        ));
    }
}
