//! Session-wide adaptive throttling
//!
//! Every worker reads the same delay before each request and reports each
//! request's outcome back:
//! - Rate limited: the delay grows by `step_up`, up to `ceiling`
//! - Success: the delay shrinks by `step_down`, down to zero
//!
//! The same outcomes drive a streak of consecutive rate limits; once the
//! streak exceeds `block_threshold` the session is considered blocked and no
//! new jobs are dispatched.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Adaptive delay and block detection settings
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottlePolicy {
    /// Added to the delay after a rate-limited outcome
    pub step_up: Duration,

    /// Removed from the delay after a successful outcome
    pub step_down: Duration,

    /// Largest delay the throttle will apply
    pub ceiling: Duration,

    /// Consecutive rate limits tolerated before the session is blocked
    pub block_threshold: u64,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            step_up: Duration::from_millis(500),
            step_down: Duration::from_millis(100),
            ceiling: Duration::from_secs(5),
            block_threshold: 50,
        }
    }
}

/// Shared throttle state
#[derive(Debug)]
pub struct Throttle {
    policy: ThrottlePolicy,
    delay: RwLock<Duration>,
    streak: AtomicU64,
}

impl Throttle {
    pub fn new(policy: ThrottlePolicy) -> Self {
        Self {
            policy,
            delay: RwLock::new(Duration::ZERO),
            streak: AtomicU64::new(0),
        }
    }

    /// Delay every worker applies before its next request
    pub fn current_delay(&self) -> Duration {
        *self.delay.read()
    }

    /// Consecutive rate-limited outcomes since the last success
    pub fn consecutive_rate_limits(&self) -> u64 {
        self.streak.load(Ordering::SeqCst)
    }

    /// Records a successful request
    pub fn record_success(&self) {
        self.streak.store(0, Ordering::SeqCst);

        let mut delay = self.delay.write();
        *delay = delay.saturating_sub(self.policy.step_down);
    }

    /// Records a rate-limited request
    pub fn record_rate_limit(&self) {
        self.streak.fetch_add(1, Ordering::SeqCst);

        let mut delay = self.delay.write();
        *delay = (*delay + self.policy.step_up).min(self.policy.ceiling);
    }

    /// Returns true once the rate-limit streak exceeds the block threshold
    pub fn is_blocked(&self) -> bool {
        self.consecutive_rate_limits() > self.policy.block_threshold
    }

    /// Sleeps for the current delay
    ///
    /// Returns false if the token was cancelled while waiting.
    pub async fn wait(&self, cancel: &CancellationToken) -> bool {
        let delay = self.current_delay();
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }

        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(ThrottlePolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_zero() {
        let throttle = Throttle::default();
        assert_eq!(throttle.current_delay(), Duration::ZERO);
        assert_eq!(throttle.consecutive_rate_limits(), 0);
        assert!(!throttle.is_blocked());
    }

    #[test]
    fn test_rate_limits_climb_to_ceiling_and_stay() {
        let throttle = Throttle::default();

        for _ in 0..10 {
            throttle.record_rate_limit();
        }
        assert_eq!(throttle.current_delay(), Duration::from_secs(5));

        for _ in 0..20 {
            throttle.record_rate_limit();
        }
        assert_eq!(throttle.current_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_successes_drain_to_zero() {
        let throttle = Throttle::default();
        for _ in 0..3 {
            throttle.record_rate_limit();
        }
        assert_eq!(throttle.current_delay(), Duration::from_millis(1500));

        throttle.record_success();
        assert_eq!(throttle.current_delay(), Duration::from_millis(1400));

        for _ in 0..100 {
            throttle.record_success();
        }
        assert_eq!(throttle.current_delay(), Duration::ZERO);
    }

    #[test]
    fn test_ceiling_is_not_overshot_by_uneven_steps() {
        let throttle = Throttle::new(ThrottlePolicy {
            step_up: Duration::from_millis(300),
            ceiling: Duration::from_millis(1000),
            ..Default::default()
        });

        for _ in 0..5 {
            throttle.record_rate_limit();
        }
        assert_eq!(throttle.current_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_block_threshold_is_exclusive() {
        let throttle = Throttle::new(ThrottlePolicy {
            block_threshold: 3,
            ..Default::default()
        });

        for _ in 0..3 {
            throttle.record_rate_limit();
        }
        assert!(!throttle.is_blocked());

        throttle.record_rate_limit();
        assert!(throttle.is_blocked());

        throttle.record_success();
        assert!(!throttle.is_blocked());
        assert_eq!(throttle.consecutive_rate_limits(), 0);
    }

    #[tokio::test]
    async fn test_wait_is_cancellable() {
        let throttle = Throttle::new(ThrottlePolicy {
            step_up: Duration::from_secs(60),
            ceiling: Duration::from_secs(60),
            ..Default::default()
        });
        throttle.record_rate_limit();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let started = std::time::Instant::now();
        assert!(!throttle.wait(&cancel).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
