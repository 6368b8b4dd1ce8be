//! Post command - one fan-out of a fixed message

use anyhow::{Context, Result, bail};
use social_daemon_adapters::content::ContentPool;
use social_daemon_adapters::halt::SentinelFile;
use social_daemon_domain::usecases::{CycleConfig, PostingCycle};
use social_daemon_domain::{CycleOutcome, Message, PlatformResult};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::PostArgs;
use crate::config::AppConfig;
use crate::wiring::{SendMode, build_senders};

pub async fn execute(args: PostArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    config.validate()?;

    let mut message = Message::new(args.text.clone()).context("--text must not be blank")?;
    if let Some(title) = &args.title {
        message = message.with_title(title.clone());
    }

    let mode = SendMode::resolve(&args.send, &config);
    tracing::info!(mode = mode.label(), "Posting fixed message");

    let senders = build_senders(&config, &mode).await?;
    let cycle = PostingCycle::new(
        Arc::new(ContentPool::new(vec![message.clone()])?),
        senders,
        Arc::new(SentinelFile::new(&config.schedule.halt_file)),
        CycleConfig {
            intervals: config.intervals(),
            send_timeout: Duration::from_secs(config.schedule.send_timeout_secs),
        },
    )
    .context("Invalid posting configuration")?;

    let outcome = cycle.run_with(&message).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    } else {
        print_outcome(&outcome);
    }

    if !outcome.halted && outcome.success_count() == 0 {
        bail!("No platform accepted the post");
    }

    Ok(())
}

fn outcome_json(outcome: &CycleOutcome) -> serde_json::Value {
    let results: Vec<serde_json::Value> = outcome
        .results
        .iter()
        .map(|(platform, result)| {
            let mut entry = serde_json::json!({
                "platform": platform,
                "status": result.kind(),
            });
            match result {
                PlatformResult::Success { reference } => {
                    entry["reference"] = serde_json::json!(reference);
                }
                PlatformResult::RateLimited { retry_after } => {
                    entry["retry_after_secs"] =
                        serde_json::json!(retry_after.map(|d| d.as_secs()));
                }
                PlatformResult::Failed { detail } => {
                    entry["detail"] = serde_json::json!(detail);
                }
            }
            entry
        })
        .collect();

    serde_json::json!({
        "halted": outcome.halted,
        "results": results,
        "interval_kind": outcome.kind,
        "next_interval_secs": outcome.next_interval.as_secs(),
    })
}

fn print_outcome(outcome: &CycleOutcome) {
    if outcome.halted {
        println!("Halt marker present; nothing was sent");
        return;
    }

    for (platform, result) in &outcome.results {
        match result {
            PlatformResult::Success { reference } => println!("✓ {}: {}", platform, reference),
            PlatformResult::RateLimited { retry_after } => match retry_after {
                Some(after) => println!(
                    "⚠ {}: rate limited (retry after {}s)",
                    platform,
                    after.as_secs()
                ),
                None => println!("⚠ {}: rate limited", platform),
            },
            PlatformResult::Failed { detail } => println!("✗ {}: {}", platform, detail),
        }
    }

    println!();
    println!(
        "{} succeeded, {} rate limited, {} failed",
        outcome.success_count(),
        outcome.rate_limited_count(),
        outcome.failed_count()
    );
}
