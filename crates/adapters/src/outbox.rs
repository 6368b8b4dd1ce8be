//! Outbox sender for dry runs: rendered posts land in a JSONL file.

use async_trait::async_trait;
use serde::Serialize;
use social_daemon_domain::{Platform, Publisher, RenderedPost, SendError, SendReceipt};
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Shared append-only handle; clones write to the same file
#[derive(Debug, Clone)]
pub struct OutboxWriter {
    file: Arc<Mutex<File>>,
}

impl OutboxWriter {
    /// Open (or create) the outbox, creating missing parent directories
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, OutboxError> {
        let path = path.as_ref();
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir).await?,
            _ => {}
        }

        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        tracing::debug!(path = %path.display(), "Opened outbox");

        Ok(Self {
            file: Arc::new(Mutex::new(file)),
        })
    }

    /// One JSON object per line, flushed before the lock is released
    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: String,
    platform: Platform,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
    text: &'a str,
    #[serde(with = "time::serde::rfc3339")]
    written_at: OffsetDateTime,
}

/// Stands in for one platform's live sender
#[derive(Debug, Clone)]
pub struct OutboxSender {
    writer: OutboxWriter,
    platform: Platform,
    max_chars: usize,
}

impl OutboxSender {
    pub fn new(writer: OutboxWriter, platform: Platform) -> Self {
        Self {
            writer,
            platform,
            max_chars: platform.default_max_chars(),
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[async_trait]
impl Publisher for OutboxSender {
    async fn publish(&self, post: &RenderedPost) -> Result<SendReceipt, SendError> {
        let id = Uuid::new_v4().to_string();
        let entry = OutboxEntry {
            id: id.clone(),
            platform: self.platform,
            title: post.title.as_deref(),
            text: &post.text,
            written_at: OffsetDateTime::now_utc(),
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| SendError::Api(format!("Outbox write failed: {}", error)))?;

        Ok(SendReceipt {
            id: format!("outbox:{}", id),
            url: None,
        })
    }

    fn platform(&self) -> Platform {
        self.platform
    }

    fn max_chars(&self) -> usize {
        self.max_chars
    }
}
