//! Doctor command - validate configuration and show status

use anyhow::Result;
use serde::Serialize;
use social_daemon_domain::Platform;
use std::path::PathBuf;

use crate::args::DoctorArgs;
use crate::config::{AppConfig, ContentKind};
use crate::wiring::load_pool;

#[derive(Debug, Serialize)]
struct DoctorReport {
    config: CheckResult,
    schedule: CheckResult,
    content: CheckResult,
    llm: CheckResult,
    halt: CheckResult,
    platforms: Vec<PlatformCheck>,
    overall: String,
}

#[derive(Debug, Serialize)]
struct PlatformCheck {
    platform: Platform,
    #[serde(flatten)]
    result: CheckResult,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    status: String,
    message: String,
    details: Option<serde_json::Value>,
}

impl CheckResult {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

pub async fn execute(args: DoctorArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut report = DoctorReport {
        config: CheckResult::error("Not checked"),
        schedule: CheckResult::error("Not checked"),
        content: CheckResult::error("Not checked"),
        llm: CheckResult::error("Not checked"),
        halt: CheckResult::error("Not checked"),
        platforms: vec![],
        overall: "error".to_string(),
    };

    let config = match AppConfig::load(config_path.as_deref()) {
        Ok(c) => {
            report.config = CheckResult::ok("Configuration loaded successfully");
            Some(c)
        }
        Err(e) => {
            report.config = CheckResult::error(format!("Failed to load config: {:#}", e));
            None
        }
    };

    if let Some(ref config) = config {
        report.schedule = check_schedule(config);
        report.content = check_content(config).await;
        report.llm = check_llm(config);
        report.halt = check_halt(config);
        report.platforms = Platform::ALL
            .into_iter()
            .map(|platform| PlatformCheck {
                platform,
                result: check_platform(config, platform),
            })
            .collect();
    }

    let mut checks = vec![
        &report.config,
        &report.schedule,
        &report.content,
        &report.llm,
        &report.halt,
    ];
    checks.extend(report.platforms.iter().map(|p| &p.result));

    let has_error = checks.iter().any(|c| c.is_error());
    let all_ok = checks.iter().all(|c| c.is_ok());

    report.overall = if has_error {
        "error".to_string()
    } else if all_ok {
        "ok".to_string()
    } else {
        "warn".to_string()
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.overall == "error" {
        std::process::exit(1);
    }

    Ok(())
}

fn check_schedule(config: &AppConfig) -> CheckResult {
    if let Err(e) = config.validate() {
        return CheckResult::error(format!("{:#}", e));
    }
    if let Err(e) = config.utc_offset() {
        return CheckResult::error(format!("{:#}", e));
    }

    let s = &config.schedule;
    CheckResult::ok(format!(
        "Every {}s, backoff {}s (rate limit) / {}s (error), send timeout {}s",
        s.base_interval_secs, s.rate_limit_backoff_secs, s.error_backoff_secs, s.send_timeout_secs
    ))
    .with_details(serde_json::json!({
        "enabled_platforms": config.enabled_platforms(),
        "mood": config.mood.enabled,
    }))
}

async fn check_content(config: &AppConfig) -> CheckResult {
    let path = &config.content.pool_path;
    match load_pool(config, path, None).await {
        Ok(pool) => CheckResult::ok(format!("{} posts in {}", pool.len(), path.display()))
            .with_details(serde_json::json!({ "count": pool.len() })),
        // A generator can run without a pool, just with no fallback
        Err(e) if config.content.source == ContentKind::Llm => {
            CheckResult::warn(format!("No fallback pool: {:#}", e))
        }
        Err(e) => CheckResult::error(format!("{:#}", e)),
    }
}

fn check_llm(config: &AppConfig) -> CheckResult {
    if config.content.source != ContentKind::Llm {
        return CheckResult::ok("Not used (content.source = pool)");
    }

    let provider = &config.llm.provider;
    let model = &config.llm.model;

    match provider.as_str() {
        "anthropic" => {}
        "openai_compat" if config.llm.base_url.is_none() => {
            return CheckResult::error("openai_compat requires llm.base_url");
        }
        "openai_compat" => {}
        other => return CheckResult::error(format!("Unknown provider: {}", other)),
    }

    let api_key_env = &config.llm.api_key_env;
    if api_key_env.is_empty() {
        return CheckResult::error(format!("No API key env var configured for {}", provider));
    }

    if env_is_set(api_key_env) {
        CheckResult::ok(format!(
            "Provider: {}, Model: {}, API key: {} (set)",
            provider, model, api_key_env
        ))
    } else {
        CheckResult::error(format!(
            "Provider: {}, Model: {}, API key: {} (not set)",
            provider, model, api_key_env
        ))
    }
}

fn check_halt(config: &AppConfig) -> CheckResult {
    let path = &config.schedule.halt_file;
    if path.exists() {
        CheckResult::warn(format!(
            "Halt file {} exists; the daemon will stop at its next cycle",
            path.display()
        ))
    } else {
        CheckResult::ok(format!("Halt file {} absent", path.display()))
    }
}

fn check_platform(config: &AppConfig, platform: Platform) -> CheckResult {
    if !config.is_enabled(platform) {
        return CheckResult::ok("disabled");
    }

    let env_vars: Vec<&str> = match platform {
        Platform::Twitter => vec![config.twitter.user_token_env.as_str()],
        Platform::Mastodon => vec![config.mastodon.access_token_env.as_str()],
        Platform::Bluesky => vec![
            config.bluesky.handle_env.as_str(),
            config.bluesky.app_password_env.as_str(),
        ],
        Platform::Discord => vec![config.discord.webhook_url_env.as_str()],
        Platform::DevTo => vec![config.devto.api_key_env.as_str()],
        Platform::LinkedIn => vec![
            config.linkedin.access_token_env.as_str(),
            config.linkedin.person_id_env.as_str(),
        ],
        Platform::GithubComment => {
            if config.github_issue().is_none() {
                return CheckResult::error("repository must be owner/repo and issue non-zero");
            }
            vec![config.github.token_env.as_str()]
        }
    };

    if env_vars.iter().any(|v| v.trim().is_empty()) {
        return CheckResult::error("Credential env var name is empty");
    }

    let missing: Vec<&str> = env_vars
        .iter()
        .copied()
        .filter(|v| !env_is_set(v))
        .collect();

    let max_chars = config.max_chars(platform);
    if missing.is_empty() {
        CheckResult::ok(format!("credentials set, max {} chars", max_chars))
    } else if config.general.dry_run {
        // Dry runs never touch the network
        CheckResult::warn(format!("{} (not set), dry run only", missing.join(", ")))
    } else {
        CheckResult::error(format!("{} (not set)", missing.join(", ")))
    }
}

fn env_is_set(name: &str) -> bool {
    matches!(std::env::var(name), Ok(val) if !val.trim().is_empty())
}

fn print_report(report: &DoctorReport) {
    println!("social-daemon Doctor Report");
    println!("===========================");
    println!();

    print_check("Config", &report.config);
    print_check("Schedule", &report.schedule);
    print_check("Content", &report.content);
    print_check("LLM Provider", &report.llm);
    print_check("Halt File", &report.halt);

    if !report.platforms.is_empty() {
        println!();
        for check in &report.platforms {
            print_check(check.platform.name(), &check.result);
        }
    }

    println!();
    println!("{} Overall: {}", symbol(&report.overall), report.overall.to_uppercase());

    if report.overall == "ok" {
        println!();
        println!("Ready to run! Try: social-daemon run --dry-run --once");
    }
}

fn print_check(name: &str, result: &CheckResult) {
    println!("{} {}: {}", symbol(&result.status), name, result.message);
}

fn symbol(status: &str) -> &'static str {
    match status {
        "ok" => "✓",
        "warn" => "⚠",
        _ => "✗",
    }
}
