//! Bluesky (AT Protocol) sender
//!
//! Logs in with an app password via `com.atproto.server.createSession` and
//! keeps the session inside the sender. When a post is rejected as
//! unauthorized the cached session is dropped and re-established exactly once
//! before giving up.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::Mutex;

use crate::http::{self, DEFAULT_TIMEOUT};

const POST_COLLECTION: &str = "app.bsky.feed.post";

pub struct BlueskySender {
    client: Client,
    identifier: String,
    app_password: SecretString,
    service_url: String,
    session: Mutex<Option<Session>>,
    max_chars: usize,
}

#[derive(Clone, Deserialize)]
struct Session {
    #[serde(rename = "accessJwt")]
    access_jwt: String,
    did: String,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: PostRecord<'a>,
}

#[derive(Serialize)]
struct PostRecord<'a> {
    #[serde(rename = "$type")]
    record_type: &'a str,
    text: &'a str,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

/// XRPC error envelope
#[derive(Deserialize)]
struct XrpcError {
    error: Option<String>,
}

impl BlueskySender {
    pub fn new(identifier: String, app_password: SecretString) -> reqwest::Result<Self> {
        Self::with_service_url(identifier, app_password, "https://bsky.social".to_string())
    }

    pub fn with_service_url(
        identifier: String,
        app_password: SecretString,
        service_url: String,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            client: http::build_client(DEFAULT_TIMEOUT)?,
            identifier,
            app_password,
            service_url: service_url.trim_end_matches('/').to_string(),
            session: Mutex::new(None),
            max_chars: Platform::Bluesky.default_max_chars(),
        })
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Return the cached session, logging in when there is none
    async fn session(&self) -> Result<Session, SendError> {
        let mut cached = self.session.lock().await;
        if let Some(session) = cached.as_ref() {
            return Ok(session.clone());
        }

        let session = self.login().await?;
        *cached = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    async fn login(&self) -> Result<Session, SendError> {
        tracing::debug!(identifier = %self.identifier, "Creating Bluesky session");

        let response = self
            .client
            .post(format!(
                "{}/xrpc/com.atproto.server.createSession",
                self.service_url
            ))
            .json(&CreateSessionRequest {
                identifier: &self.identifier,
                password: self.app_password.expose_secret(),
            })
            .send()
            .await
            .map_err(http::transport_error)?;

        let response = http::check_status(response).await.map_err(|e| match e {
            SendError::Auth(detail) | SendError::Api(detail) => {
                SendError::Auth(format!("login failed: {}", detail))
            }
            other => other,
        })?;

        response
            .json()
            .await
            .map_err(|e| SendError::Auth(format!("login failed: {}", e)))
    }

    async fn create_record(
        &self,
        session: &Session,
        post: &RenderedPost,
    ) -> Result<SendReceipt, SendError> {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| SendError::Api(e.to_string()))?;

        let response = self
            .client
            .post(format!(
                "{}/xrpc/com.atproto.repo.createRecord",
                self.service_url
            ))
            .bearer_auth(&session.access_jwt)
            .json(&CreateRecordRequest {
                repo: &session.did,
                collection: POST_COLLECTION,
                record: PostRecord {
                    record_type: POST_COLLECTION,
                    text: &post.text,
                    created_at,
                },
            })
            .send()
            .await
            .map_err(http::transport_error)?;

        if response.status() == StatusCode::BAD_REQUEST {
            return Err(bad_request(response).await);
        }

        let record: CreateRecordResponse = http::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SendError::Api(e.to_string()))?;

        Ok(SendReceipt {
            url: web_url(&session.did, &record.uri),
            id: record.uri,
        })
    }
}

/// PDS servers report an expired or revoked access JWT as 400, not 401
async fn bad_request(response: Response) -> SendError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let code = serde_json::from_str::<XrpcError>(&body)
        .ok()
        .and_then(|e| e.error);

    match code.as_deref() {
        Some("ExpiredToken" | "InvalidToken") => SendError::Auth(format!("{}: {}", status, body)),
        _ => SendError::Api(format!("API returned {}: {}", status, body)),
    }
}

/// `at://{did}/app.bsky.feed.post/{rkey}` -> bsky.app link
fn web_url(did: &str, uri: &str) -> Option<String> {
    let rkey = uri.rsplit('/').next().filter(|k| !k.is_empty())?;
    Some(format!("https://bsky.app/profile/{}/post/{}", did, rkey))
}

#[async_trait]
impl Publisher for BlueskySender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        http::ensure_fits(post, self.max_chars)?;

        let session = self.session().await?;
        match self.create_record(&session, post).await {
            Err(SendError::Auth(detail)) => {
                tracing::info!(detail = %detail, "Bluesky session rejected, logging in again");
                self.invalidate_session().await;
                let session = self.session().await?;
                self.create_record(&session, post).await
            }
            other => other,
        }
    }

    fn platform(&self) -> Platform {
        Platform::Bluesky
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

    const DID: &str = "did:plc:abc123";

    fn sample_post() -> RenderedPost {
        RenderedPost {
            platform: Platform::Bluesky,
            text: "Posting from the daemon".to_string(),
            title: None,
        }
    }

    fn sender(server: &MockServer) -> BlueskySender {
        BlueskySender::with_service_url(
            "bot.bsky.social".to_string(),
            SecretString::new("app-pass".into()),
            server.uri(),
        )
        .unwrap()
    }

    fn session_response(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "accessJwt": token,
            "refreshJwt": "refresh",
            "did": DID,
            "handle": "bot.bsky.social"
        }))
    }

    fn record_response() -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "uri": format!("at://{}/app.bsky.feed.post/3kxyz", DID),
            "cid": "bafy"
        }))
    }

    #[tokio::test]
    async fn test_session_is_reused_between_posts() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .and(body_partial_json(serde_json::json!({
                "identifier": "bot.bsky.social",
                "password": "app-pass"
            })))
            .respond_with(session_response("jwt-1"))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .and(header("Authorization", "Bearer jwt-1"))
            .and(body_partial_json(serde_json::json!({
                "repo": DID,
                "collection": "app.bsky.feed.post",
                "record": { "$type": "app.bsky.feed.post", "text": "Posting from the daemon" }
            })))
            .respond_with(record_response())
            .expect(2)
            .mount(&mock_server)
            .await;

        let sender = sender(&mock_server);
        let first = sender.send(&sample_post()).await;
        let second = sender.send(&sample_post()).await;

        assert_eq!(
            first,
            PlatformResult::success(format!("https://bsky.app/profile/{}/post/3kxyz", DID))
        );
        assert!(second.is_success());
    }

    #[tokio::test]
    async fn test_expired_session_reauthenticates_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(session_response("stale"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(session_response("fresh"))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "ExpiredToken"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(record_response())
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = sender(&mock_server).send(&sample_post()).await;

        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_expired_token_bad_request_reauthenticates_on_every_expiry() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(session_response("stale"))
            .up_to_n_times(1)
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(session_response("fresh"))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .and(header("Authorization", "Bearer stale"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "ExpiredToken",
                "message": "Token has expired"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .and(header("Authorization", "Bearer fresh"))
            .respond_with(record_response())
            .expect(3)
            .mount(&mock_server)
            .await;

        let sender = sender(&mock_server);
        for _ in 0..3 {
            assert!(sender.send(&sample_post()).await.is_success());
        }
    }

    #[tokio::test]
    async fn test_other_bad_request_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(session_response("jwt"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "InvalidRequest",
                "message": "Record/text must not be longer than 300 graphemes"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = sender(&mock_server).send(&sample_post()).await;

        assert!(
            matches!(result, PlatformResult::Failed { ref detail } if detail.contains("InvalidRequest"))
        );
    }

    #[tokio::test]
    async fn test_persistent_auth_failure_is_not_retried_forever() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(session_response("jwt"))
            .expect(2)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.repo.createRecord"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&mock_server)
            .await;

        let result = sender(&mock_server).send(&sample_post()).await;

        assert!(matches!(result, PlatformResult::Failed { .. }));
    }

    #[tokio::test]
    async fn test_login_failure_is_failed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/xrpc/com.atproto.server.createSession"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad password"))
            .mount(&mock_server)
            .await;

        let result = sender(&mock_server).send(&sample_post()).await;

        assert!(
            matches!(result, PlatformResult::Failed { ref detail } if detail.contains("login failed"))
        );
    }

    #[test]
    fn test_web_url_from_at_uri() {
        assert_eq!(
            web_url(DID, "at://did:plc:abc123/app.bsky.feed.post/3kxyz").as_deref(),
            Some("https://bsky.app/profile/did:plc:abc123/post/3kxyz")
        );
        assert_eq!(web_url(DID, "at://did/"), None);
    }
}
