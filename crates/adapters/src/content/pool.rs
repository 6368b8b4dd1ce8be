//! Content pool loaded from a TOML file
//!
//! ```toml
//! [[posts]]
//! text = "Short post for every platform"
//!
//! [[posts]]
//! text = "Teaser for the article"
//! title = "Article title"
//! article = "Full markdown body for long-form platforms"
//! ```

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{ContentError, ContentSource, Message, MessageError};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid pool file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Pool contains no posts")]
    Empty,
    #[error("Post #{index} is invalid: {source}")]
    InvalidEntry {
        index: usize,
        #[source]
        source: MessageError,
    },
}

/// One `[[posts]]` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolEntry {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PoolFile {
    #[serde(default)]
    posts: Vec<PoolEntry>,
}

struct Selection {
    rng: StdRng,
    last: Option<usize>,
}

/// Uniform random selection over a fixed set of messages.
///
/// With avoid-repeat on (the default) and more than one message, the same
/// message is never returned twice in a row.
pub struct ContentPool {
    messages: Vec<Message>,
    avoid_repeat: bool,
    selection: Mutex<Selection>,
}

impl ContentPool {
    pub fn new(messages: Vec<Message>) -> Result<Self, PoolError> {
        if messages.is_empty() {
            return Err(PoolError::Empty);
        }
        Ok(Self {
            messages,
            avoid_repeat: true,
            selection: Mutex::new(Selection {
                rng: StdRng::from_entropy(),
                last: None,
            }),
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, PoolError> {
        let file: PoolFile = toml::from_str(contents)?;
        let messages = file
            .posts
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                entry_to_message(entry)
                    .map_err(|source| PoolError::InvalidEntry { index: i + 1, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(messages)
    }

    pub async fn load(path: &Path) -> Result<Self, PoolError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| PoolError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let pool = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), posts = pool.len(), "Loaded content pool");
        Ok(pool)
    }

    /// Fix the random sequence; `None` keeps entropy seeding
    pub fn with_seed(self, seed: Option<u64>) -> Self {
        if let Some(seed) = seed {
            self.selection
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .rng = StdRng::seed_from_u64(seed);
        }
        self
    }

    pub fn with_avoid_repeat(mut self, avoid_repeat: bool) -> Self {
        self.avoid_repeat = avoid_repeat;
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Pick the next message
    pub fn pick(&self) -> Message {
        let mut selection = self.selection.lock().unwrap_or_else(|p| p.into_inner());
        let n = self.messages.len();

        let index = match selection.last {
            Some(last) if self.avoid_repeat && n > 1 => {
                // uniform over the other n-1 entries
                let i = selection.rng.gen_range(0..n - 1);
                if i >= last { i + 1 } else { i }
            }
            _ => selection.rng.gen_range(0..n),
        };

        selection.last = Some(index);
        self.messages[index].clone()
    }
}

fn entry_to_message(entry: PoolEntry) -> Result<Message, MessageError> {
    let mut message = Message::new(entry.text)?;
    if let Some(title) = entry.title {
        message = message.with_title(title);
    }
    if let Some(article) = entry.article {
        message = message.with_article(article);
    }
    Ok(message)
}

#[async_trait]
impl ContentSource for ContentPool {
    async fn next_message(&self) -> Result<Message, ContentError> {
        Ok(self.pick())
    }
}
