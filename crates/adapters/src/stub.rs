//! Stub sender for offline runs and tests

use async_trait::async_trait;
use social_daemon_domain::{Platform, PlatformResult, Publisher, RenderedPost, SendError, SendReceipt};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Replays scripted results, then succeeds; records everything it was sent
pub struct StubSender {
    platform: Platform,
    max_chars: usize,
    script: Mutex<VecDeque<PlatformResult>>,
    sent: Mutex<Vec<RenderedPost>>,
    counter: AtomicU64,
}

impl StubSender {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            max_chars: platform.default_max_chars(),
            script: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Results returned in order before falling back to success
    pub fn with_script(self, results: impl IntoIterator<Item = PlatformResult>) -> Self {
        self.script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .extend(results);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Everything passed to `publish`, in call order
    pub fn sent(&self) -> Vec<RenderedPost> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl Publisher for StubSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(post.clone());

        let scripted = self
            .script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();

        match scripted {
            Some(PlatformResult::Success { reference }) => Ok(SendReceipt {
                id: reference,
                url: None,
            }),
            Some(PlatformResult::RateLimited { retry_after }) => {
                Err(SendError::RateLimited(retry_after))
            }
            Some(PlatformResult::Failed { detail }) => Err(SendError::Api(detail)),
            None => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(SendReceipt {
                    id: format!("stub-{}-{}", self.platform, n),
                    url: None,
                })
            }
        }
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}
