//! Domain models and value objects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A social platform the daemon can post to.
///
/// Declaration order is the fan-out order; `Ord` is derived from it so sorted
/// sender lists are deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Twitter,
    Mastodon,
    Bluesky,
    Discord,
    #[serde(rename = "devto")]
    DevTo,
    #[serde(rename = "linkedin")]
    LinkedIn,
    #[serde(rename = "github")]
    GithubComment,
}

impl Platform {
    /// All platforms in fan-out order
    pub const ALL: [Platform; 7] = [
        Platform::Twitter,
        Platform::Mastodon,
        Platform::Bluesky,
        Platform::Discord,
        Platform::DevTo,
        Platform::LinkedIn,
        Platform::GithubComment,
    ];

    /// Stable identifier used in config, logs and the outbox
    pub fn name(self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Mastodon => "mastodon",
            Platform::Bluesky => "bluesky",
            Platform::Discord => "discord",
            Platform::DevTo => "devto",
            Platform::LinkedIn => "linkedin",
            Platform::GithubComment => "github",
        }
    }

    /// Documented maximum post length in characters
    pub fn default_max_chars(self) -> usize {
        match self {
            Platform::Twitter => 280,
            Platform::Bluesky => 300,
            Platform::Mastodon => 500,
            Platform::Discord => 2000,
            Platform::LinkedIn => 3000,
            Platform::GithubComment => 65_536,
            Platform::DevTo => 100_000,
        }
    }

    /// Whether the platform takes long-form markdown rather than a short post
    pub fn is_long_form(self) -> bool {
        matches!(self, Platform::DevTo | Platform::GithubComment)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown platform '{0}'")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        match wanted.as_str() {
            "x" => return Ok(Platform::Twitter),
            "dev.to" => return Ok(Platform::DevTo),
            _ => {}
        }
        Platform::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| UnknownPlatform(s.to_string()))
    }
}

/// Error building a message
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("Message text is empty")]
    Empty,
}

/// An immutable post payload.
///
/// `text` is the short form used by micro-blogging platforms. Long-form
/// platforms prefer `article` when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    text: String,
    title: Option<String>,
    article: Option<String>,
}

impl Message {
    /// Create a message; whitespace-only text is rejected
    pub fn new(text: impl Into<String>) -> Result<Self, MessageError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(MessageError::Empty);
        }
        Ok(Self {
            text,
            title: None,
            article: None,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = (!title.trim().is_empty()).then_some(title);
        self
    }

    pub fn with_article(mut self, article: impl Into<String>) -> Self {
        let article = article.into();
        self.article = (!article.trim().is_empty()).then_some(article);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn article(&self) -> Option<&str> {
        self.article.as_deref()
    }

    /// Title to use where one is mandatory, falling back to the first
    /// non-blank line
    pub fn title_or_first_line(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| {
            self.text
                .lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or(self.text.trim())
        })
    }
}

/// Content rendered for one platform, already within its length limit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPost {
    /// Target platform
    pub platform: Platform,
    /// Body to transmit
    pub text: String,
    /// Title, for platforms that take one
    pub title: Option<String>,
}

/// Outcome of one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformResult {
    /// Posted; `reference` is an id or URL used for logging
    Success { reference: String },
    /// The platform signaled backpressure
    RateLimited { retry_after: Option<Duration> },
    /// Any other failure
    Failed { detail: String },
}

impl PlatformResult {
    pub fn success(reference: impl Into<String>) -> Self {
        PlatformResult::Success {
            reference: reference.into(),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        PlatformResult::Failed {
            detail: detail.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PlatformResult::Success { .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, PlatformResult::RateLimited { .. })
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            PlatformResult::Success { .. } => "success",
            PlatformResult::RateLimited { .. } => "rate_limited",
            PlatformResult::Failed { .. } => "failed",
        }
    }
}

/// Which branch of the interval policy was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalKind {
    Base,
    RateLimitBackoff,
    ErrorBackoff,
}

/// Aggregated result of one tick
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Per-platform results in fan-out order
    pub results: Vec<(Platform, PlatformResult)>,
    /// Policy branch chosen for the next wait
    pub kind: IntervalKind,
    /// Wait before the next cycle, after jitter
    pub next_interval: Duration,
    /// The halt marker was observed; the scheduler must stop
    pub halted: bool,
    /// The content source failed and nothing was sent
    pub content_error: Option<String>,
}

impl CycleOutcome {
    /// Sentinel outcome for an observed halt marker
    pub fn halted() -> Self {
        Self {
            results: vec![],
            kind: IntervalKind::Base,
            next_interval: Duration::ZERO,
            halted: true,
            content_error: None,
        }
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_success()).count()
    }

    pub fn rate_limited_count(&self) -> usize {
        self.results
            .iter()
            .filter(|(_, r)| r.is_rate_limited())
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.success_count() - self.rate_limited_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_order_is_fan_out_order() {
        let mut shuffled = vec![Platform::GithubComment, Platform::Twitter, Platform::Discord];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Platform::Twitter, Platform::Discord, Platform::GithubComment]
        );
    }

    #[test]
    fn test_platform_parse_round_trips_names() {
        for platform in Platform::ALL {
            assert_eq!(platform.name().parse::<Platform>().unwrap(), platform);
        }
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::Twitter);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_message_rejects_blank_text() {
        assert_eq!(Message::new("   \n"), Err(MessageError::Empty));
    }

    #[test]
    fn test_message_title_falls_back_to_first_line() {
        let message = Message::new("Headline here\n\nBody text").unwrap();
        assert_eq!(message.title_or_first_line(), "Headline here");

        let titled = message.with_title("Explicit");
        assert_eq!(titled.title_or_first_line(), "Explicit");
    }

    #[test]
    fn test_message_title_skips_leading_blank_lines() {
        let message = Message::new("\n  \n  Hello there\nrest").unwrap();
        assert_eq!(message.title_or_first_line(), "Hello there");
    }

    #[test]
    fn test_outcome_counts() {
        let outcome = CycleOutcome {
            results: vec![
                (Platform::Twitter, PlatformResult::success("1")),
                (Platform::Mastodon, PlatformResult::failed("boom")),
                (
                    Platform::Bluesky,
                    PlatformResult::RateLimited { retry_after: None },
                ),
            ],
            kind: IntervalKind::Base,
            next_interval: Duration::from_secs(1),
            halted: false,
            content_error: None,
        };

        assert_eq!(outcome.success_count(), 1);
        assert_eq!(outcome.rate_limited_count(), 1);
        assert_eq!(outcome.failed_count(), 1);
    }
}
