//! LLM-backed post generators

pub mod anthropic;
pub mod openai_compat;

pub use anthropic::AnthropicGenerator;
pub use openai_compat::OpenAiCompatGenerator;

use serde::{Deserialize, Serialize};
use social_daemon_domain::{ContentError, Message};
use std::future::Future;
use std::time::Duration;

/// Common LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// System prompt describing the voice and topics of the account
    pub prompt: String,
    /// Temperature (0.0-1.0)
    pub temperature: f64,
    /// Maximum output tokens
    pub max_output_tokens: u32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries on failure
    pub retries: u32,
    /// Length the generated post should stay under
    pub max_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-latest".to_string(),
            prompt: "You write short, friendly social media posts about software engineering."
                .to_string(),
            temperature: 0.9,
            max_output_tokens: 300,
            timeout_secs: 45,
            retries: 2,
            max_chars: 280,
        }
    }
}

/// The user turn sent alongside the configured system prompt
pub fn build_generation_prompt(max_chars: usize) -> String {
    format!(
        "Write one new post for today. Keep it under {} characters. \
         Reply with the post text only: no quotes, no preamble, no hashtags list.",
        max_chars
    )
}

/// Turn raw model output into a message, stripping code fences and quotes
pub fn parse_generated(raw: &str) -> Result<Message, ContentError> {
    let mut text = raw.trim();

    if let Some(inner) = text.strip_prefix("```") {
        let inner = inner.split_once('\n').map_or(inner, |(_, rest)| rest);
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}')] {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            text = inner.trim();
        }
    }

    Message::new(text).map_err(|_| ContentError::Empty)
}

/// Run `call` with up to `retries` extra attempts and exponential delay.
///
/// Rate limiting is returned immediately.
pub(crate) async fn with_retries<F, Fut>(retries: u32, call: F) -> Result<Message, ContentError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<String, ContentError>>,
{
    let mut last_error = None;
    for attempt in 0..=retries {
        if attempt > 0 {
            tracing::warn!(attempt = attempt, "Retrying generation");
            tokio::time::sleep(Duration::from_millis(500 * 2_u64.pow(attempt))).await;
        }

        match call().await {
            Ok(raw) => match parse_generated(&raw) {
                Ok(message) => return Ok(message),
                Err(e) => {
                    tracing::warn!(error = %e, "Generator returned nothing usable");
                    last_error = Some(e);
                }
            },
            Err(ContentError::RateLimited) => return Err(ContentError::RateLimited),
            Err(e) => {
                tracing::warn!(error = %e, "Generation attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| ContentError::Generator("Unknown error".to_string())))
}

pub(crate) fn transport_error(error: reqwest::Error) -> ContentError {
    if error.is_timeout() {
        ContentError::Timeout
    } else {
        ContentError::Generator(error.to_string())
    }
}
