//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Message, Platform, PlatformResult, RenderedPost};

/// Error type for sender operations
#[derive(Debug, Error)]
pub enum SendError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<Duration>),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Timed out")]
    Timeout,
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
}

impl From<SendError> for PlatformResult {
    fn from(error: SendError) -> Self {
        match error {
            SendError::RateLimited(retry_after) => PlatformResult::RateLimited { retry_after },
            other => PlatformResult::Failed {
                detail: other.to_string(),
            },
        }
    }
}

/// Receipt for a successful post
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published content, if available
    pub url: Option<String>,
}

impl SendReceipt {
    /// URL when known, else the raw ID
    pub fn reference(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.id)
    }
}

/// Port for delivering a post to one platform
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Transmit a rendered post
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError>;

    /// The platform this sender delivers to
    fn platform(&self) -> Platform;

    /// Length limit applied when rendering for this sender
    fn max_chars(&self) -> usize {
        self.platform().default_max_chars()
    }

    /// Publish and fold every error into a tagged result
    async fn send(&self, post: &RenderedPost) -> PlatformResult {
        match self.publish(post).await {
            Ok(receipt) => PlatformResult::success(receipt.reference()),
            Err(error) => error.into(),
        }
    }
}

/// Error type for content sources
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Generator error: {0}")]
    Generator(String),
    #[error("Generator rate limited")]
    RateLimited,
    #[error("Generator timed out")]
    Timeout,
    #[error("Generated content was empty")]
    Empty,
}

/// Port for obtaining the next message to post
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Produce the next message; never an empty one
    async fn next_message(&self) -> Result<Message, ContentError>;
}

/// Port for the external stop request, polled at the start of every cycle
pub trait HaltSignal: Send + Sync {
    fn should_halt(&self) -> bool;
}

/// Halt signal that never fires
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverHalt;

impl HaltSignal for NeverHalt {
    fn should_halt(&self) -> bool {
        false
    }
}

/// Port for perturbing the policy interval
pub trait IntervalJitter: Send + Sync {
    /// Return the interval to actually wait, given the policy interval and
    /// this cycle's results
    fn vary(&self, interval: Duration, results: &[(Platform, PlatformResult)]) -> Duration;
}

/// Identity jitter
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl IntervalJitter for NoJitter {
    fn vary(&self, interval: Duration, _results: &[(Platform, PlatformResult)]) -> Duration {
        interval
    }
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
