//! Exponential backoff for calls to external systems.
//!
//! Failures are retried forever. The delay grows as
//! `start * factor^attempt` and stays pinned at `border` once it reaches it.
//! Every wrapped call counts its own attempts from zero.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use movies_etl_shared::FamilyKind;

/// Default first delay, in seconds.
pub const DEFAULT_START_SECS: f64 = 0.1;

/// Default growth factor.
pub const DEFAULT_FACTOR: f64 = 2.0;

/// Default ceiling delay, in seconds.
pub const DEFAULT_BORDER_SECS: f64 = 10.0;

/// Delay schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// First delay, in seconds.
    pub start: f64,
    /// Growth factor applied per attempt.
    pub factor: f64,
    /// Ceiling delay, in seconds.
    pub border: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_SECS,
            factor: DEFAULT_FACTOR,
            border: DEFAULT_BORDER_SECS,
        }
    }
}

impl Backoff {
    /// Create a schedule.
    pub fn new(start: f64, factor: f64, border: f64) -> Self {
        Self {
            start,
            factor,
            border,
        }
    }

    /// Delay before retrying after failed attempt `attempt`, in seconds.
    pub fn delay_secs(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay = self.start * self.factor.powi(exponent);
        if !delay.is_finite() || delay >= self.border {
            self.border
        } else {
            delay.max(0.0)
        }
    }

    /// Delay before retrying after failed attempt `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.delay_secs(attempt))
    }
}

/// Suspends the current task.
///
/// Injected so tests can observe retries without waiting.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Sleep for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Backoff schedule paired with the sleeper it waits on.
#[derive(Clone)]
pub struct RetryPolicy {
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryPolicy {
    /// Create a policy.
    pub fn new(backoff: Backoff, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { backoff, sleeper }
    }

    /// Delay schedule of this policy.
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Start counting attempts of one wrapped call.
    pub fn attempts(&self, operation: &'static str, family: FamilyKind) -> Attempts {
        Attempts {
            backoff: self.backoff,
            sleeper: Arc::clone(&self.sleeper),
            operation,
            family,
            attempt: 0,
        }
    }

    /// Run `call` until it succeeds, sleeping between failures.
    pub async fn retry<T, E, F, Fut>(&self, operation: &'static str, family: FamilyKind, mut call: F) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts = self.attempts(operation, family);
        loop {
            match call().await {
                Ok(value) => return value,
                Err(e) => attempts.failed(&e).await,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Backoff::default(), Arc::new(TokioSleeper))
    }
}

/// Attempt counter of a single wrapped call.
///
/// Used directly by loops that need to run several steps per attempt.
pub struct Attempts {
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
    operation: &'static str,
    family: FamilyKind,
    attempt: u32,
}

impl Attempts {
    /// Number of failures recorded so far.
    pub fn count(&self) -> u32 {
        self.attempt
    }

    /// Record a failure, log it and sleep for the scheduled delay.
    pub async fn failed<E: Display + ?Sized>(&mut self, error: &E) {
        let delay = self.backoff.delay(self.attempt);
        warn!(
            family = %self.family,
            operation = self.operation,
            attempt = self.attempt,
            delay_secs = delay.as_secs_f64(),
            error = %error,
            "Call failed, retrying"
        );
        self.sleeper.sleep(delay).await;
        self.attempt = self.attempt.saturating_add(1);
    }
}


#[cfg(test)]
mod tests {
    use super::testing::recording_policy;
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_delay_sequence_pins_at_border() {
        let backoff = Backoff::new(0.1, 2.0, 10.0);
        let delays: Vec<f64> = (0..10).map(|n| backoff.delay_secs(n)).collect();

        assert_close(
            &delays,
            &[0.1, 0.2, 0.4, 0.8, 1.6, 3.2, 6.4, 10.0, 10.0, 10.0],
        );
    }

    #[test]
    fn test_delay_survives_huge_attempt_counts() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay_secs(u32::MAX), 10.0);
        assert_eq!(backoff.delay(5000), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_retry_sleeps_between_failures() {
        let (policy, sleeper) = recording_policy();
        let mut calls = 0;

        let value = policy
            .retry("connect", FamilyKind::Movies, || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < 4 {
                        Err(format!("refused #{}", attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(value, 4);
        assert_close(&sleeper.secs(), &[0.1, 0.2, 0.4]);
    }

    #[tokio::test]
    async fn test_each_call_counts_from_zero() {
        let (policy, sleeper) = recording_policy();

        for _ in 0..2 {
            let mut failures = 2;
            policy
                .retry("connect", FamilyKind::Genres, || {
                    let fail = failures > 0;
                    failures -= 1;
                    async move {
                        if fail {
                            Err("down")
                        } else {
                            Ok(())
                        }
                    }
                })
                .await;
        }

        assert_close(&sleeper.secs(), &[0.1, 0.2, 0.1, 0.2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_sleeper_waits_scheduled_delays() {
        let policy = RetryPolicy::default();
        let started = tokio::time::Instant::now();
        let mut failures = 3;

        policy
            .retry("connect", FamilyKind::Movies, || {
                let fail = failures > 0;
                failures -= 1;
                async move {
                    if fail {
                        Err("refused")
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(700), "{:?}", elapsed);
        assert!(elapsed < Duration::from_millis(710), "{:?}", elapsed);
    }

    #[tokio::test]
    async fn test_attempts_count_failures() {
        let (policy, sleeper) = recording_policy();
        let mut attempts = policy.attempts("bulk upsert", FamilyKind::Persons);

        for _ in 0..8 {
            attempts.failed("partial write").await;
        }

        assert_eq!(attempts.count(), 8);
        assert_close(
            &sleeper.secs(),
            &[0.1, 0.2, 0.4, 0.8, 1.6, 3.2, 6.4, 10.0],
        );
    }
}
