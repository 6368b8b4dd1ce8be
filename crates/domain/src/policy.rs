//! Interval policy: how long to wait after a cycle

use std::time::Duration;

use crate::model::{IntervalKind, Platform, PlatformResult};

/// The three waits a daemon chooses between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPolicy {
    /// Wait after a cycle with at least one success
    pub base: Duration,
    /// Wait when nothing succeeded and some platform pushed back
    pub rate_limit_backoff: Duration,
    /// Wait when nothing succeeded for any other reason
    pub error_backoff: Duration,
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2 * 60 * 60),
            rate_limit_backoff: Duration::from_secs(15 * 60),
            error_backoff: Duration::from_secs(5 * 60),
        }
    }
}

impl IntervalPolicy {
    /// Reject zero intervals, which would turn the scheduler into a busy loop
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("base interval", self.base),
            ("rate-limit backoff", self.rate_limit_backoff),
            ("error backoff", self.error_backoff),
        ] {
            if value.is_zero() {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        Ok(())
    }

    /// Classify a cycle's results.
    ///
    /// Any success wins outright, so partial failure never shortens or
    /// lengthens the wait. Rate limiting is checked before the generic
    /// zero-success case.
    pub fn choose(&self, results: &[(Platform, PlatformResult)]) -> (IntervalKind, Duration) {
        let any_success = results.iter().any(|(_, r)| r.is_success());
        let any_rate_limited = results.iter().any(|(_, r)| r.is_rate_limited());

        if any_success {
            (IntervalKind::Base, self.base)
        } else if any_rate_limited {
            (IntervalKind::RateLimitBackoff, self.rate_limit_backoff)
        } else {
            (IntervalKind::ErrorBackoff, self.error_backoff)
        }
    }
}

/// Fatal startup configuration problems
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("No platforms are enabled")]
    NoPlatforms,
    #[error("Platform '{0}' is configured more than once")]
    DuplicatePlatform(Platform),
    #[error("The {0} must be greater than zero")]
    ZeroInterval(&'static str),
}
