//! Content command - inspect the content pool

use anyhow::Result;
use social_daemon_domain::Platform;
use social_daemon_domain::usecases::render_for;
use std::path::PathBuf;

use crate::args::{ContentArgs, ContentCommands};
use crate::config::AppConfig;
use crate::wiring::load_pool;

pub async fn execute(args: ContentArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;

    match args.command {
        ContentCommands::List { pool, json } => list_posts(&config, pool, json).await,
        ContentCommands::Validate { pool } => validate_posts(&config, pool).await,
    }
}

async fn list_posts(config: &AppConfig, pool_path: Option<PathBuf>, json: bool) -> Result<()> {
    let path = pool_path.unwrap_or_else(|| config.content.pool_path.clone());
    let pool = load_pool(config, &path, None).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(pool.messages())?);
        return Ok(());
    }

    println!("Found {} posts in {}:", pool.len(), path.display());
    println!();

    for (i, message) in pool.messages().iter().enumerate() {
        let chars = message.text().chars().count();
        let summary = first_line(message.text());
        match message.title() {
            Some(title) => println!("  {:>3}. [{}] {} ({} chars)", i + 1, title, summary, chars),
            None => println!("  {:>3}. {} ({} chars)", i + 1, summary, chars),
        }
        if message.article().is_some() {
            println!("       + article for long-form platforms");
        }
    }

    Ok(())
}

async fn validate_posts(config: &AppConfig, pool_path: Option<PathBuf>) -> Result<()> {
    let path = pool_path.unwrap_or_else(|| config.content.pool_path.clone());
    let pool = load_pool(config, &path, None).await?;

    // Check against every platform when none is enabled yet
    let mut platforms = config.enabled_platforms();
    if platforms.is_empty() {
        platforms = Platform::ALL.to_vec();
    }

    let mut truncated = 0;
    for (i, message) in pool.messages().iter().enumerate() {
        for &platform in &platforms {
            let max_chars = config.max_chars(platform);
            let body = if platform.is_long_form() {
                message.article().unwrap_or(message.text())
            } else {
                message.text()
            };
            let len = body.chars().count();

            if len > max_chars {
                let rendered = render_for(platform, message, max_chars);
                println!(
                    "⚠ Post #{} will be truncated on {}: {} > {} chars (ends \"…{}\")",
                    i + 1,
                    platform,
                    len,
                    max_chars,
                    tail(&rendered.text, 20)
                );
                truncated += 1;
            }
        }
    }

    println!("✓ {} posts valid", pool.len());
    if truncated > 0 {
        println!("⚠ {} truncation(s) would occur", truncated);
    }

    Ok(())
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or(text);
    if line.chars().count() > 60 {
        let mut short: String = line.chars().take(57).collect();
        short.push_str("...");
        short
    } else {
        line.to_string()
    }
}

fn tail(text: &str, n: usize) -> String {
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(n)).collect()
}
