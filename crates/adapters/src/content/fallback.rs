//! Primary/fallback content source pair

use async_trait::async_trait;
use social_daemon_domain::{ContentError, ContentSource, Message};
use std::sync::Arc;

/// Uses `fallback` whenever `primary` fails, e.g. a generator backed by a pool
pub struct FallbackContent {
    primary: Arc<dyn ContentSource>,
    fallback: Arc<dyn ContentSource>,
}

impl FallbackContent {
    pub fn new(primary: Arc<dyn ContentSource>, fallback: Arc<dyn ContentSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ContentSource for FallbackContent {
    async fn next_message(&self) -> Result<Message, ContentError> {
        match self.primary.next_message().await {
            Ok(message) => Ok(message),
            Err(error) => {
                tracing::warn!(error = %error, "Primary content source failed, using fallback");
                self.fallback.next_message().await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentPool;

    struct Broken;

    #[async_trait]
    impl ContentSource for Broken {
        async fn next_message(&self) -> Result<Message, ContentError> {
            Err(ContentError::Timeout)
        }
    }

    fn pool() -> Arc<dyn ContentSource> {
        Arc::new(ContentPool::from_toml_str("[[posts]]\ntext = \"canned\"\n").unwrap())
    }

    #[tokio::test]
    async fn test_uses_fallback_on_error() {
        let source = FallbackContent::new(Arc::new(Broken), pool());
        assert_eq!(source.next_message().await.unwrap().text(), "canned");
    }

    #[tokio::test]
    async fn test_prefers_primary() {
        let primary: Arc<dyn ContentSource> =
            Arc::new(ContentPool::from_toml_str("[[posts]]\ntext = \"fresh\"\n").unwrap());
        let source = FallbackContent::new(primary, pool());
        assert_eq!(source.next_message().await.unwrap().text(), "fresh");
    }

    #[tokio::test]
    async fn test_both_failing_surfaces_fallback_error() {
        let source = FallbackContent::new(Arc::new(Broken), Arc::new(Broken));
        assert!(matches!(
            source.next_message().await,
            Err(ContentError::Timeout)
        ));
    }
}
