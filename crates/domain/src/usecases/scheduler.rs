//! Scheduler loop - repeats the posting cycle until halted or interrupted

use std::future::Future;

use crate::usecases::cycle::PostingCycle;

/// Configuration for the scheduler
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Stop after this many cycles (None = run until halted)
    pub max_cycles: Option<u64>,
}

/// Why the scheduler returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// The halt marker was observed at a cycle start
    Halted,
    /// The shutdown future resolved during a wait
    Interrupted,
    /// `max_cycles` was reached
    CycleLimit,
}

/// Summary of a scheduler run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerReport {
    pub exit: SchedulerExit,
    /// Cycles that reached fan-out (halted ticks are not counted)
    pub cycles: u64,
}

/// Sequential driver for a [`PostingCycle`]
pub struct Scheduler {
    cycle: PostingCycle,
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(cycle: PostingCycle, config: SchedulerConfig) -> Self {
        Self { cycle, config }
    }

    pub fn cycle(&self) -> &PostingCycle {
        &self.cycle
    }

    /// Run cycles back to back, sleeping each outcome's interval in between.
    ///
    /// `shutdown` only interrupts the sleep; a fan-out in progress always
    /// completes.
    pub async fn run<F>(&self, shutdown: F) -> SchedulerReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut cycles = 0u64;

        loop {
            let outcome = self.cycle.run_cycle().await;
            if outcome.halted {
                tracing::info!(cycles, "Halting scheduler");
                return SchedulerReport {
                    exit: SchedulerExit::Halted,
                    cycles,
                };
            }

            cycles += 1;
            if self.config.max_cycles.is_some_and(|max| cycles >= max) {
                return SchedulerReport {
                    exit: SchedulerExit::CycleLimit,
                    cycles,
                };
            }

            tracing::debug!(
                next_interval_secs = outcome.next_interval.as_secs(),
                "Sleeping until next cycle"
            );

            tokio::select! {
                _ = tokio::time::sleep(outcome.next_interval) => {}
                _ = &mut shutdown => {
                    tracing::info!(cycles, "Shutdown signal received");
                    return SchedulerReport {
                        exit: SchedulerExit::Interrupted,
                        cycles,
                    };
                }
            }
        }
    }
}
