//! Retry policy for rate-limited requests
//!
//! Only rate-limit signals are retried. The decision is a pure function of
//! the attempt number, the error, and a jitter sample in `[0, 1)`, so the
//! schedule can be tested without sleeping.

use crate::crawler::FetchError;
use std::time::Duration;

/// Exponential backoff settings
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first
    pub max_attempts: u32,

    /// Backoff after the first rate-limited attempt
    pub base_backoff: Duration,

    /// Upper bound on the un-jittered backoff
    pub max_backoff: Duration,

    /// Maximum jitter as a fraction of the backoff (0.0-1.0)
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(30),
            jitter_factor: 0.5,
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryDecision {
    /// Sleep for the given duration, then try again
    Wait(Duration),

    /// Return the error to the caller
    GiveUp,
}

impl RetryPolicy {
    /// Un-jittered backoff after the given zero-based attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(31));
        self.base_backoff
            .checked_mul(factor)
            .map_or(self.max_backoff, |d| d.min(self.max_backoff))
    }

    /// Decides whether to retry after `attempt` (zero-based) failed with `error`
    ///
    /// `jitter` is a sample in `[0, 1)`; it scales the random extra wait.
    /// There is no wait after the final attempt.
    pub fn decide(&self, attempt: u32, error: &FetchError, jitter: f64) -> RetryDecision {
        if !error.is_rate_limit() || attempt + 1 >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        let backoff = self.backoff(attempt);
        let extra = backoff.mul_f64(self.jitter_factor * jitter.clamp(0.0, 1.0));
        RetryDecision::Wait(backoff + extra)
    }
}
