//! Builds adapters from configuration

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use social_daemon_adapters::content::llm::{self, AnthropicGenerator, OpenAiCompatGenerator};
use social_daemon_adapters::content::{ContentPool, FallbackContent};
use social_daemon_adapters::outbox::{OutboxSender, OutboxWriter};
use social_daemon_adapters::platforms::{
    BlueskySender, DevToSender, DiscordSender, GithubCommentSender, IssueRef, LinkedInSender,
    MastodonSender, TwitterSender,
};
use social_daemon_adapters::stub::StubSender;
use social_daemon_domain::{ContentSource, Platform, Publisher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::args::SendArgs;
use crate::config::{AppConfig, ContentKind};

/// Where rendered posts go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendMode {
    Live,
    DryRun { outbox: PathBuf },
    Offline,
}

impl SendMode {
    pub fn resolve(args: &SendArgs, config: &AppConfig) -> Self {
        if args.offline {
            SendMode::Offline
        } else if args.dry_run || config.general.dry_run {
            SendMode::DryRun {
                outbox: args
                    .outbox
                    .clone()
                    .unwrap_or_else(|| config.general.outbox_path.clone()),
            }
        } else {
            SendMode::Live
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SendMode::Live => "live",
            SendMode::DryRun { .. } => "dry_run",
            SendMode::Offline => "offline",
        }
    }
}

/// One sender per enabled platform, in fan-out order
pub async fn build_senders(config: &AppConfig, mode: &SendMode) -> Result<Vec<Arc<dyn Publisher>>> {
    let platforms = config.enabled_platforms();
    if platforms.is_empty() {
        bail!("No platforms enabled; enable at least one platform section");
    }

    let writer = match mode {
        SendMode::DryRun { outbox } => Some(
            OutboxWriter::open(outbox)
                .await
                .with_context(|| format!("Failed to open outbox: {}", outbox.display()))?,
        ),
        _ => None,
    };

    let mut senders: Vec<Arc<dyn Publisher>> = Vec::with_capacity(platforms.len());
    for platform in platforms {
        let max_chars = config.max_chars(platform);
        let sender: Arc<dyn Publisher> = match (mode, &writer) {
            (SendMode::Offline, _) => {
                Arc::new(StubSender::new(platform).with_max_chars(max_chars))
            }
            (SendMode::DryRun { .. }, Some(writer)) => {
                Arc::new(OutboxSender::new(writer.clone(), platform).with_max_chars(max_chars))
            }
            _ => build_live_sender(config, platform)
                .with_context(|| format!("Failed to set up {} sender", platform))?,
        };
        senders.push(sender);
    }

    Ok(senders)
}

fn build_live_sender(config: &AppConfig, platform: Platform) -> Result<Arc<dyn Publisher>> {
    let max_chars = config.max_chars(platform);

    let sender: Arc<dyn Publisher> = match platform {
        Platform::Twitter => {
            let token = load_secret(&config.twitter.user_token_env, "twitter")?;
            Arc::new(TwitterSender::new(token)?.with_max_chars(max_chars))
        }
        Platform::Mastodon => {
            let token = load_secret(&config.mastodon.access_token_env, "mastodon")?;
            Arc::new(
                MastodonSender::new(token, config.mastodon.instance_url.clone())?
                    .with_visibility(config.mastodon.visibility.clone())
                    .with_max_chars(max_chars),
            )
        }
        Platform::Bluesky => {
            let handle = load_plain(&config.bluesky.handle_env, "bluesky")?;
            let password = load_secret(&config.bluesky.app_password_env, "bluesky")?;
            Arc::new(
                BlueskySender::with_service_url(
                    handle,
                    password,
                    config.bluesky.service_url.clone(),
                )?
                .with_max_chars(max_chars),
            )
        }
        Platform::Discord => {
            let webhook = load_secret(&config.discord.webhook_url_env, "discord")?;
            Arc::new(
                DiscordSender::new(webhook)?
                    .with_username(config.discord.username.clone())
                    .with_max_chars(max_chars),
            )
        }
        Platform::DevTo => {
            let key = load_secret(&config.devto.api_key_env, "devto")?;
            Arc::new(
                DevToSender::new(key)?
                    .with_tags(&config.devto.tags)
                    .with_published(config.devto.published)
                    .with_max_chars(max_chars),
            )
        }
        Platform::LinkedIn => {
            let token = load_secret(&config.linkedin.access_token_env, "linkedin")?;
            let person = load_plain(&config.linkedin.person_id_env, "linkedin")?;
            Arc::new(LinkedInSender::new(token, &person)?.with_max_chars(max_chars))
        }
        Platform::GithubComment => {
            let (owner, repo, number) = config
                .github_issue()
                .context("[github] needs repository = \"owner/repo\" and a non-zero issue")?;
            let token = load_secret(&config.github.token_env, "github")?;
            Arc::new(
                GithubCommentSender::new(
                    token,
                    IssueRef {
                        owner,
                        repo,
                        number,
                    },
                )?
                .with_max_chars(max_chars),
            )
        }
    };

    Ok(sender)
}

/// Content source per `[content]`, with the pool as fallback for generators
pub async fn build_content(config: &AppConfig, seed: Option<u64>) -> Result<Arc<dyn ContentSource>> {
    let seed = seed.or(config.content.seed);

    match config.content.source {
        ContentKind::Pool => {
            let pool = load_pool(config, &config.content.pool_path, seed).await?;
            Ok(Arc::new(pool))
        }
        ContentKind::Llm => {
            let generator = build_generator(config)?;
            match load_pool(config, &config.content.pool_path, seed).await {
                Ok(pool) => Ok(Arc::new(FallbackContent::new(generator, Arc::new(pool)))),
                Err(e) => {
                    tracing::warn!(error = %e, "No fallback pool, generator failures will skip cycles");
                    Ok(generator)
                }
            }
        }
    }
}

pub async fn load_pool(config: &AppConfig, path: &Path, seed: Option<u64>) -> Result<ContentPool> {
    let pool = ContentPool::load(path)
        .await
        .with_context(|| format!("Failed to load content pool: {}", path.display()))?;
    Ok(pool
        .with_seed(seed)
        .with_avoid_repeat(config.content.avoid_repeat))
}

fn build_generator(config: &AppConfig) -> Result<Arc<dyn ContentSource>> {
    // Aim for the shortest enabled limit so truncation rarely kicks in
    let max_chars = config
        .enabled_platforms()
        .into_iter()
        .filter(|p| !p.is_long_form())
        .map(|p| config.max_chars(p))
        .min()
        .unwrap_or(Platform::Twitter.default_max_chars());

    let llm_config = llm::LlmConfig {
        model: config.llm.model.clone(),
        prompt: config.llm.prompt.clone(),
        temperature: config.llm.temperature,
        max_output_tokens: config.llm.max_output_tokens,
        timeout_secs: config.llm.timeout_secs,
        retries: config.llm.retries,
        max_chars,
    };

    let api_key = load_secret(&config.llm.api_key_env, &config.llm.provider)?;

    let generator: Arc<dyn ContentSource> = match config.llm.provider.as_str() {
        "anthropic" => match &config.llm.base_url {
            Some(base_url) => Arc::new(AnthropicGenerator::with_base_url(
                api_key,
                base_url.clone(),
                llm_config,
            )?),
            None => Arc::new(AnthropicGenerator::new(api_key, llm_config)?),
        },
        "openai_compat" => {
            let base_url = config
                .llm
                .base_url
                .clone()
                .context("llm.base_url is required for openai_compat")?;
            Arc::new(OpenAiCompatGenerator::new(api_key, base_url, llm_config)?)
        }
        other => bail!("Unknown LLM provider: {}", other),
    };

    Ok(generator)
}

/// Read a credential from the environment variable named in config
pub(crate) fn load_secret(env_var: &str, label: &str) -> Result<SecretString> {
    Ok(SecretString::new(load_plain(env_var, label)?.into()))
}

fn load_plain(env_var: &str, label: &str) -> Result<String> {
    if env_var.trim().is_empty() {
        bail!("No credential env var configured for {}", label);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing env var {} for {}", env_var, label))?;

    if value.trim().is_empty() {
        bail!("Env var {} is empty for {}", env_var, label);
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(toml: &str) -> AppConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_send_mode_resolution() {
        let mut config = AppConfig::default();
        config.general.dry_run = false;

        assert_eq!(SendMode::resolve(&SendArgs::default(), &config), SendMode::Live);

        let dry = SendArgs {
            dry_run: true,
            outbox: Some(PathBuf::from("out.jsonl")),
            ..SendArgs::default()
        };
        assert_eq!(
            SendMode::resolve(&dry, &config),
            SendMode::DryRun {
                outbox: PathBuf::from("out.jsonl")
            }
        );

        config.general.dry_run = true;
        let offline = SendArgs {
            offline: true,
            ..SendArgs::default()
        };
        assert_eq!(SendMode::resolve(&offline, &config), SendMode::Offline);
    }

    #[tokio::test]
    async fn test_offline_senders_follow_fan_out_order() {
        let config = config_with(
            "[bluesky]\nenabled = true\n[twitter]\nenabled = true\nmax_chars = 100\n",
        );
        let senders = build_senders(&config, &SendMode::Offline).await.unwrap();

        let platforms: Vec<Platform> = senders.iter().map(|s| s.platform()).collect();
        assert_eq!(platforms, vec![Platform::Twitter, Platform::Bluesky]);
        assert_eq!(senders[0].max_chars(), 100);
    }

    #[tokio::test]
    async fn test_live_sender_needs_credentials() {
        let config = config_with(
            "[twitter]\nenabled = true\nuser_token_env = \"SOCIAL_DAEMON_TEST_UNSET_TOKEN\"\n",
        );
        let err = build_senders(&config, &SendMode::Live).await.err().unwrap();
        assert!(format!("{:#}", err).contains("SOCIAL_DAEMON_TEST_UNSET_TOKEN"));
    }

    #[tokio::test]
    async fn test_no_platforms_is_an_error() {
        let config = AppConfig::default();
        assert!(build_senders(&config, &SendMode::Offline).await.is_err());
    }
}
