//! Posting cycle use case - one tick of halt check, selection and fan-out

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use crate::{
    model::{CycleOutcome, IntervalKind, Message, Platform, PlatformResult},
    policy::{ConfigError, IntervalPolicy},
    ports::{ContentSource, HaltSignal, IntervalJitter, NoJitter, Publisher},
    usecases::render::render_for,
};

/// Configuration for the posting cycle
#[derive(Debug, Clone)]
pub struct CycleConfig {
    /// Interval policy applied after each fan-out
    pub intervals: IntervalPolicy,
    /// Ceiling on a single send; exceeding it counts as a failure
    pub send_timeout: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            intervals: IntervalPolicy::default(),
            send_timeout: Duration::from_secs(30),
        }
    }
}

/// Runs one posting tick against a fixed set of senders
pub struct PostingCycle {
    content: Arc<dyn ContentSource>,
    senders: Vec<Arc<dyn Publisher>>,
    halt: Arc<dyn HaltSignal>,
    jitter: Arc<dyn IntervalJitter>,
    config: CycleConfig,
}

impl PostingCycle {
    /// Build a cycle. Fails when no sender is given, a platform appears
    /// twice, or an interval is zero.
    pub fn new(
        content: Arc<dyn ContentSource>,
        mut senders: Vec<Arc<dyn Publisher>>,
        halt: Arc<dyn HaltSignal>,
        config: CycleConfig,
    ) -> Result<Self, ConfigError> {
        config.intervals.validate()?;

        if senders.is_empty() {
            return Err(ConfigError::NoPlatforms);
        }

        senders.sort_by_key(|s| s.platform());
        for pair in senders.windows(2) {
            if pair[0].platform() == pair[1].platform() {
                return Err(ConfigError::DuplicatePlatform(pair[0].platform()));
            }
        }

        Ok(Self {
            content,
            senders,
            halt,
            jitter: Arc::new(NoJitter),
            config,
        })
    }

    /// Replace the identity jitter
    pub fn with_jitter(mut self, jitter: Arc<dyn IntervalJitter>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Enabled platforms in fan-out order
    pub fn platforms(&self) -> Vec<Platform> {
        self.senders.iter().map(|s| s.platform()).collect()
    }

    /// Run one tick: halt check, content selection, fan-out, classification.
    ///
    /// Always returns an outcome; per-platform and content errors are folded
    /// into it.
    pub async fn run_cycle(&self) -> CycleOutcome {
        if self.halt.should_halt() {
            tracing::info!("Halt marker present, stopping before fan-out");
            return CycleOutcome::halted();
        }

        match self.content.next_message().await {
            Ok(message) => self.fan_out(&message).await,
            Err(error) => {
                tracing::error!(error = %error, "Content source failed, nothing sent");
                let mut outcome = self.classify(vec![]);
                outcome.content_error = Some(error.to_string());
                outcome
            }
        }
    }

    /// Run one tick with a caller-supplied message instead of the content
    /// source. The halt marker is still honored.
    pub async fn run_with(&self, message: &Message) -> CycleOutcome {
        if self.halt.should_halt() {
            tracing::info!("Halt marker present, stopping before fan-out");
            return CycleOutcome::halted();
        }
        self.fan_out(message).await
    }

    async fn fan_out(&self, message: &Message) -> CycleOutcome {
        tracing::info!(
            platforms = self.senders.len(),
            preview = %preview(message.text()),
            "Posting"
        );

        let sends = self
            .senders
            .iter()
            .map(|sender| self.send_one(sender.as_ref(), message));
        let results = join_all(sends).await;

        self.classify(results)
    }

    async fn send_one(
        &self,
        sender: &dyn Publisher,
        message: &Message,
    ) -> (Platform, PlatformResult) {
        let platform = sender.platform();
        let post = render_for(platform, message, sender.max_chars());

        let result = match tokio::time::timeout(self.config.send_timeout, sender.send(&post)).await
        {
            Ok(result) => result,
            Err(_) => PlatformResult::failed(format!(
                "timed out after {}s",
                self.config.send_timeout.as_secs()
            )),
        };

        match &result {
            PlatformResult::Success { reference } => {
                tracing::info!(platform = %platform, reference = %reference, "Posted");
            }
            PlatformResult::RateLimited { retry_after } => {
                tracing::warn!(
                    platform = %platform,
                    retry_after_secs = ?retry_after.map(|d| d.as_secs()),
                    "Rate limited"
                );
            }
            PlatformResult::Failed { detail } => {
                tracing::error!(platform = %platform, detail = %detail, "Post failed");
            }
        }

        (platform, result)
    }

    fn classify(&self, results: Vec<(Platform, PlatformResult)>) -> CycleOutcome {
        let (kind, interval) = self.config.intervals.choose(&results);
        let varied = self.jitter.vary(interval, &results);

        // Jitter may stretch a backoff but never shorten it.
        let next_interval = match kind {
            IntervalKind::Base => varied,
            IntervalKind::RateLimitBackoff | IntervalKind::ErrorBackoff => varied.max(interval),
        };

        let outcome = CycleOutcome {
            results,
            kind,
            next_interval,
            halted: false,
            content_error: None,
        };

        tracing::info!(
            successes = outcome.success_count(),
            rate_limited = outcome.rate_limited_count(),
            failed = outcome.failed_count(),
            interval_kind = ?kind,
            next_interval_secs = next_interval.as_secs(),
            "Cycle complete"
        );

        outcome
    }
}

fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    crate::usecases::render::truncate_chars(first_line, 50)
}
