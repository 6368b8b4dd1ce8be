//! Configuration loading and management

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use social_daemon_domain::Platform;
use social_daemon_domain::policy::IntervalPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::UtcOffset;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub mood: MoodConfig,

    #[serde(default)]
    pub twitter: TwitterConfig,

    #[serde(default)]
    pub mastodon: MastodonConfig,

    #[serde(default)]
    pub bluesky: BlueskyConfig,

    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub devto: DevToConfig,

    #[serde(default)]
    pub linkedin: LinkedInConfig,

    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default = "default_outbox_path")]
    pub outbox_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_base_interval")]
    pub base_interval_secs: u64,

    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,

    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,

    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,

    #[serde(default = "default_halt_file")]
    pub halt_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Pool,
    Llm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    #[serde(default = "default_content_source")]
    pub source: ContentKind,

    #[serde(default = "default_pool_path")]
    pub pool_path: PathBuf,

    #[serde(default)]
    pub seed: Option<u64>,

    #[serde(default = "default_true")]
    pub avoid_repeat: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_prompt")]
    pub prompt: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_llm_retries")]
    pub retries: u32,

    #[serde(default = "default_llm_api_key_env")]
    pub api_key_env: String,

    /// Required for openai_compat; overrides the Anthropic endpoint otherwise
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoodConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Offset of the account's local time from UTC, for the circadian curve
    #[serde(default)]
    pub utc_offset_hours: i8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_twitter_token_env")]
    pub user_token_env: String,

    #[serde(default)]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_mastodon_instance")]
    pub instance_url: String,

    #[serde(default = "default_mastodon_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_mastodon_visibility")]
    pub visibility: String,

    #[serde(default)]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_bluesky_service")]
    pub service_url: String,

    #[serde(default = "default_bluesky_handle_env")]
    pub handle_env: String,

    #[serde(default = "default_bluesky_password_env")]
    pub app_password_env: String,

    #[serde(default)]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_discord_webhook_env")]
    pub webhook_url_env: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevToConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_devto_key_env")]
    pub api_key_env: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_true")]
    pub published: bool,

    #[serde(default)]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedInConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_linkedin_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_linkedin_person_env")]
    pub person_id_env: String,

    #[serde(default)]
    pub max_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_github_token_env")]
    pub token_env: String,

    /// `owner/repo`
    #[serde(default)]
    pub repository: String,

    #[serde(default)]
    pub issue: u64,

    #[serde(default)]
    pub max_chars: Option<usize>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_outbox_path() -> PathBuf {
    PathBuf::from("./outbox.jsonl")
}

fn default_base_interval() -> u64 {
    7200
}

fn default_rate_limit_backoff() -> u64 {
    900
}

fn default_error_backoff() -> u64 {
    300
}

fn default_send_timeout() -> u64 {
    30
}

fn default_halt_file() -> PathBuf {
    PathBuf::from("kill.switch")
}

fn default_content_source() -> ContentKind {
    ContentKind::Pool
}

fn default_pool_path() -> PathBuf {
    PathBuf::from("./posts.toml")
}

fn default_provider() -> String {
    "anthropic".to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_prompt() -> String {
    "You write short, friendly social media posts about software engineering.".to_string()
}

fn default_temperature() -> f64 {
    0.9
}

fn default_max_output_tokens() -> u32 {
    300
}

fn default_llm_timeout() -> u64 {
    45
}

fn default_llm_retries() -> u32 {
    2
}

fn default_llm_api_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_twitter_token_env() -> String {
    "X_USER_TOKEN".to_string()
}

fn default_mastodon_instance() -> String {
    "https://mastodon.social".to_string()
}

fn default_mastodon_token_env() -> String {
    "MASTODON_ACCESS_TOKEN".to_string()
}

fn default_mastodon_visibility() -> String {
    "public".to_string()
}

fn default_bluesky_service() -> String {
    "https://bsky.social".to_string()
}

fn default_bluesky_handle_env() -> String {
    "BLUESKY_HANDLE".to_string()
}

fn default_bluesky_password_env() -> String {
    "BLUESKY_APP_PASSWORD".to_string()
}

fn default_discord_webhook_env() -> String {
    "DISCORD_WEBHOOK_URL".to_string()
}

fn default_devto_key_env() -> String {
    "DEVTO_API_KEY".to_string()
}

fn default_linkedin_token_env() -> String {
    "LINKEDIN_ACCESS_TOKEN".to_string()
}

fn default_linkedin_person_env() -> String {
    "LINKEDIN_PERSON_ID".to_string()
}

fn default_github_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: default_true(),
            outbox_path: default_outbox_path(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: default_base_interval(),
            rate_limit_backoff_secs: default_rate_limit_backoff(),
            error_backoff_secs: default_error_backoff(),
            send_timeout_secs: default_send_timeout(),
            halt_file: default_halt_file(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            source: default_content_source(),
            pool_path: default_pool_path(),
            seed: None,
            avoid_repeat: default_true(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            prompt: default_prompt(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_llm_timeout(),
            retries: default_llm_retries(),
            api_key_env: default_llm_api_key_env(),
            base_url: None,
        }
    }
}

impl Default for MoodConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            utc_offset_hours: 0,
        }
    }
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            user_token_env: default_twitter_token_env(),
            max_chars: None,
        }
    }
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            instance_url: default_mastodon_instance(),
            access_token_env: default_mastodon_token_env(),
            visibility: default_mastodon_visibility(),
            max_chars: None,
        }
    }
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_url: default_bluesky_service(),
            handle_env: default_bluesky_handle_env(),
            app_password_env: default_bluesky_password_env(),
            max_chars: None,
        }
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            webhook_url_env: default_discord_webhook_env(),
            username: None,
            max_chars: None,
        }
    }
}

impl Default for DevToConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key_env: default_devto_key_env(),
            tags: vec![],
            published: default_true(),
            max_chars: None,
        }
    }
}

impl Default for LinkedInConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            access_token_env: default_linkedin_token_env(),
            person_id_env: default_linkedin_person_env(),
            max_chars: None,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token_env: default_github_token_env(),
            repository: String::new(),
            issue: 0,
            max_chars: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("SOCIAL_DAEMON")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Startup checks; failures are fatal configuration errors
    pub fn validate(&self) -> Result<()> {
        self.intervals()
            .validate()
            .context("Invalid [schedule] section")?;

        if self.schedule.send_timeout_secs == 0 {
            bail!("Invalid [schedule] section: send_timeout_secs must be non-zero");
        }

        if self.enabled_platforms().is_empty() {
            bail!("No platforms enabled; enable at least one platform section");
        }

        for platform in self.enabled_platforms() {
            if self.max_chars(platform) == 0 {
                bail!("[{}] max_chars must be non-zero", platform);
            }
        }

        if self.github.enabled && self.github_issue().is_none() {
            bail!("[github] needs repository = \"owner/repo\" and a non-zero issue");
        }

        Ok(())
    }

    /// Enabled platforms in fan-out order
    pub fn enabled_platforms(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| self.is_enabled(*p))
            .collect()
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        match platform {
            Platform::Twitter => self.twitter.enabled,
            Platform::Mastodon => self.mastodon.enabled,
            Platform::Bluesky => self.bluesky.enabled,
            Platform::Discord => self.discord.enabled,
            Platform::DevTo => self.devto.enabled,
            Platform::LinkedIn => self.linkedin.enabled,
            Platform::GithubComment => self.github.enabled,
        }
    }

    /// Configured limit, falling back to the platform default
    pub fn max_chars(&self, platform: Platform) -> usize {
        let configured = match platform {
            Platform::Twitter => self.twitter.max_chars,
            Platform::Mastodon => self.mastodon.max_chars,
            Platform::Bluesky => self.bluesky.max_chars,
            Platform::Discord => self.discord.max_chars,
            Platform::DevTo => self.devto.max_chars,
            Platform::LinkedIn => self.linkedin.max_chars,
            Platform::GithubComment => self.github.max_chars,
        };
        configured.unwrap_or_else(|| platform.default_max_chars())
    }

    pub fn intervals(&self) -> IntervalPolicy {
        IntervalPolicy {
            base: Duration::from_secs(self.schedule.base_interval_secs),
            rate_limit_backoff: Duration::from_secs(self.schedule.rate_limit_backoff_secs),
            error_backoff: Duration::from_secs(self.schedule.error_backoff_secs),
        }
    }

    pub fn utc_offset(&self) -> Result<UtcOffset> {
        UtcOffset::from_hms(self.mood.utc_offset_hours, 0, 0)
            .with_context(|| format!("Invalid mood.utc_offset_hours: {}", self.mood.utc_offset_hours))
    }

    /// `(owner, repo, issue)` when the github section is complete
    pub fn github_issue(&self) -> Option<(String, String, u64)> {
        let (owner, repo) = self.github.repository.split_once('/')?;
        if owner.is_empty() || repo.is_empty() || self.github.issue == 0 {
            return None;
        }
        Some((owner.to_string(), repo.to_string(), self.github.issue))
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# social-daemon configuration
#
# Credentials are never stored here: each platform names the environment
# variable that holds its secret. A .env file in the working directory is
# loaded at startup. Any key can be overridden with SOCIAL_DAEMON__SECTION__KEY.

[general]
log_level = "info"
# Write posts to outbox_path instead of publishing
dry_run = true
outbox_path = "./outbox.jsonl"

[schedule]
base_interval_secs = 7200
rate_limit_backoff_secs = 900
error_backoff_secs = 300
send_timeout_secs = 30
# The daemon stops at the next cycle while this file exists
halt_file = "kill.switch"

[content]
source = "pool"  # pool, llm
pool_path = "./posts.toml"
# seed = 42
avoid_repeat = true

[llm]
provider = "anthropic"  # anthropic, openai_compat
model = "claude-3-5-haiku-latest"
prompt = "You write short, friendly social media posts about software engineering."
temperature = 0.9
max_output_tokens = 300
timeout_secs = 45
retries = 2
api_key_env = "ANTHROPIC_API_KEY"
# base_url = "https://api.openai.com/v1"

[mood]
enabled = true
utc_offset_hours = 0

[twitter]
enabled = true
user_token_env = "X_USER_TOKEN"
# max_chars = 280

[mastodon]
enabled = true
instance_url = "https://mastodon.social"
access_token_env = "MASTODON_ACCESS_TOKEN"
visibility = "public"

[bluesky]
enabled = true
service_url = "https://bsky.social"
handle_env = "BLUESKY_HANDLE"
app_password_env = "BLUESKY_APP_PASSWORD"

[discord]
enabled = false
webhook_url_env = "DISCORD_WEBHOOK_URL"
# username = "social-daemon"

[devto]
enabled = false
api_key_env = "DEVTO_API_KEY"
tags = ["programming"]
published = true

[linkedin]
enabled = false
access_token_env = "LINKEDIN_ACCESS_TOKEN"
person_id_env = "LINKEDIN_PERSON_ID"

[github]
enabled = false
token_env = "GITHUB_TOKEN"
repository = "owner/repo"
issue = 1
"#
        .to_string()
    }

    /// Example content pool written next to the config by `config init`
    pub fn example_pool_toml() -> String {
        r#"# Posts picked at random by the daemon. Long-form platforms (dev.to,
# GitHub comments) use `article` when present; dev.to also needs a title,
# which defaults to the first line of `text`.

[[posts]]
text = "Small, boring deploys are the best kind of deploys."

[[posts]]
text = "Reading old code is a conversation with your past self. Be kind to them."

[[posts]]
text = "Notes on keeping a side project alive for a year"
title = "Keeping a side project alive"
article = """
## Keeping a side project alive

Ship something every week, even if it is small.
"""
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses_and_validates() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();

        assert!(config.general.dry_run);
        assert_eq!(config.schedule.base_interval_secs, 7200);
        assert_eq!(config.schedule.halt_file, PathBuf::from("kill.switch"));
        assert_eq!(
            config.enabled_platforms(),
            vec![Platform::Twitter, Platform::Mastodon, Platform::Bluesky]
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults_have_no_platforms() {
        let config = AppConfig::default();
        assert!(config.enabled_platforms().is_empty());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let mut config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        config.schedule.error_backoff_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_chars_override() {
        let config: AppConfig =
            toml::from_str("[twitter]\nenabled = true\nmax_chars = 25000\n").unwrap();
        assert_eq!(config.max_chars(Platform::Twitter), 25000);
        assert_eq!(config.max_chars(Platform::Bluesky), 300);
    }

    #[test]
    fn test_github_issue_parsing() {
        let mut config = AppConfig::default();
        config.github.repository = "acme/widgets".to_string();
        config.github.issue = 7;
        assert_eq!(
            config.github_issue(),
            Some(("acme".to_string(), "widgets".to_string(), 7))
        );

        config.github.repository = "widgets".to_string();
        assert_eq!(config.github_issue(), None);
    }

    #[test]
    fn test_example_pool_parses() {
        let pool: toml::Value = toml::from_str(&AppConfig::example_pool_toml()).unwrap();
        assert_eq!(pool["posts"].as_array().map(Vec::len), Some(3));
    }
}
