//! Shared HTTP plumbing for the platform senders

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use social_daemon_domain::{RenderedPost, SendError};
use std::time::Duration;

/// Per-request timeout used when a sender is built without an override
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const USER_AGENT: &str = concat!("social-daemon/", env!("CARGO_PKG_VERSION"));

pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
}

/// Map a non-2xx response onto a [`SendError`]; 2xx responses pass through.
pub async fn check_status(response: Response) -> Result<Response, SendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && forbidden_is_rate_limit(response.headers()))
    {
        return Err(SendError::RateLimited(retry_after(response.headers())));
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SendError::Auth(format!("{}: {}", status, body)));
    }

    Err(SendError::Api(format!("API returned {}: {}", status, body)))
}

pub fn transport_error(error: reqwest::Error) -> SendError {
    if error.is_timeout() {
        SendError::Timeout
    } else {
        SendError::Api(error.to_string())
    }
}

/// Reject bodies the cycle should already have truncated
pub fn ensure_fits(post: &RenderedPost, max_chars: usize) -> Result<(), SendError> {
    let len = post.text.chars().count();
    if len > max_chars {
        return Err(SendError::ContentTooLong {
            len,
            max: max_chars,
        });
    }
    Ok(())
}

/// GitHub answers primary and secondary rate limits with 403
fn forbidden_is_rate_limit(headers: &HeaderMap) -> bool {
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    exhausted || headers.contains_key(RETRY_AFTER)
}

/// `Retry-After` in delta-seconds form; HTTP-date values are ignored
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
