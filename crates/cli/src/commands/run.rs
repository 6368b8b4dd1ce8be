//! Run command - the posting loop

use anyhow::{Context, Result};
use social_daemon_adapters::halt::SentinelFile;
use social_daemon_domain::mood::Soul;
use social_daemon_domain::usecases::{
    CycleConfig, PostingCycle, Scheduler, SchedulerConfig, SchedulerExit,
};
use social_daemon_domain::SystemClock;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::args::RunArgs;
use crate::config::AppConfig;
use crate::wiring::{SendMode, build_content, build_senders};

pub async fn execute(args: RunArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    config.validate()?;

    let mode = SendMode::resolve(&args.send, &config);
    let mood = config.mood.enabled && !args.no_mood;

    tracing::info!(
        mode = mode.label(),
        once = args.once,
        mood = mood,
        platforms = ?config.enabled_platforms(),
        halt_file = %config.schedule.halt_file.display(),
        "Starting social-daemon run"
    );

    let senders = build_senders(&config, &mode).await?;
    let content = build_content(&config, args.seed).await?;
    let halt = Arc::new(SentinelFile::new(&config.schedule.halt_file));

    let mut cycle = PostingCycle::new(
        content,
        senders,
        halt,
        CycleConfig {
            intervals: config.intervals(),
            send_timeout: Duration::from_secs(config.schedule.send_timeout_secs),
        },
    )
    .context("Invalid posting configuration")?;

    if mood {
        let soul = Soul::new(
            Arc::new(SystemClock),
            config.utc_offset()?,
            args.seed.or(config.content.seed),
        );
        cycle = cycle.with_jitter(Arc::new(soul));
    }

    let scheduler = Scheduler::new(
        cycle,
        SchedulerConfig {
            max_cycles: args.once.then_some(1),
        },
    );

    let shutdown = shutdown_signal()?;
    let report = scheduler.run(shutdown).await;

    match report.exit {
        SchedulerExit::Halted => tracing::info!(cycles = report.cycles, "Halted by marker file"),
        SchedulerExit::Interrupted => {
            tracing::info!(cycles = report.cycles, "Shutting down gracefully")
        }
        SchedulerExit::CycleLimit => tracing::info!(cycles = report.cycles, "Cycle limit reached"),
    }

    tracing::info!("social-daemon run completed");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
///
/// The listeners are installed before returning so a signal that arrives
/// during the first fan-out is not lost.
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;

    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }

        #[cfg(not(unix))]
        ctrl_c.await;

        tracing::info!("Shutdown signal received");
        let _ = tx.send(());
    });

    Ok(async move {
        if rx.await.is_err() {
            std::future::pending::<()>().await;
        }
    })
}
