//! Bounded retry wrapper for fallible async operations.
//!
//! A [`RetryPolicy`] re-invokes an operation up to a fixed attempt budget,
//! sleeping per an exponential [`Backoff`] between attempts. Only errors
//! matched by the caller-supplied predicate are retried; everything else
//! propagates immediately. Each [`run`](RetryPolicy::run) call starts a
//! fresh backoff sequence.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::backoff::Backoff;

/// Retry configuration: attempt budget plus backoff parameters.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    attempts: u32,
    backoff_initial: f64,
    backoff_multiplier: f64,
    backoff_maximum: f64,
}

impl Default for RetryPolicy {
    /// 10 attempts with 2s initial delay doubling up to 300s.
    fn default() -> Self {
        Self {
            attempts: 10,
            backoff_initial: 2.0,
            backoff_multiplier: 2.0,
            backoff_maximum: 300.0,
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the attempt budget. Must be at least 1.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        assert!(attempts >= 1, "attempt budget must be at least 1");
        self.attempts = attempts;
        self
    }

    /// Overrides the backoff parameters (seconds).
    pub fn with_backoff(mut self, initial: f64, multiplier: f64, maximum: f64) -> Self {
        self.backoff_initial = initial;
        self.backoff_multiplier = multiplier;
        self.backoff_maximum = maximum;
        self
    }

    /// Runs `op` until it succeeds, fails with a non-retryable error, or
    /// exhausts the attempt budget.
    ///
    /// `retryable` inspects each error; a false return propagates the error
    /// immediately without logging here — permanent classifications are the
    /// caller's concern.
    pub async fn run<T, E, F, Fut>(&self, mut op: F, retryable: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut backoff = Backoff::new(
            self.backoff_initial,
            self.backoff_multiplier,
            self.backoff_maximum,
        );
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if attempt >= self.attempts || !retryable(&err) {
                        return Err(err);
                    }
                    let delay = backoff.decay();
                    warn!(
                        error = %err,
                        tries_left = self.attempts - attempt,
                        delay_secs = delay,
                        "Retrying after failure"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(delay)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fast policy so tests sleep microseconds instead of seconds.
    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new()
            .with_attempts(attempts)
            .with_backoff(0.000_1, 2.0, 0.001)
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<u64, String> = fast_policy(10)
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 3 {
                            Err(format!("transient failure {}", n))
                        } else {
                            Ok(42)
                        }
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_exhausts_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u64, String> = fast_policy(5)
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("always failing".to_string()) }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err("always failing".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<u64, String> = fast_policy(10)
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("permanent failure".to_string()) }
                },
                |_| false,
            )
            .await;

        assert_eq!(result, Err("permanent failure".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_predicate_distinguishes_error_kinds() {
        use crate::error::FetchError;

        let calls = AtomicU32::new(0);
        let result: Result<(), FetchError> = fast_policy(10)
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            Err(FetchError::Connection("unreachable".to_string()))
                        } else {
                            Err(FetchError::NotFound)
                        }
                    }
                },
                FetchError::is_connection,
            )
            .await;

        // The connection failure is retried once; the not-found that
        // follows stops the sequence.
        assert!(matches!(result, Err(FetchError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<u64, String> = fast_policy(1)
            .run(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err("failure".to_string()) }
                },
                |_| true,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
