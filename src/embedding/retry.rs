//! Exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Attempt budget and delay schedule for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Factor applied to the delay after each failed attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries immediately; intended for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }
}

/// Terminal failure of a retried operation.
#[derive(Debug)]
pub struct RetryError<E> {
    /// Error returned by the final attempt.
    pub last_error: E,
    /// Attempts made before giving up.
    pub attempts: u32,
}

/// Run `operation` until it succeeds or the policy's attempt budget is spent.
///
/// Every error is treated as transient.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut operation: F) -> Result<T, RetryError<E>>
where
    E: std::fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt >= max_attempts => {
                return Err(RetryError {
                    last_error: error,
                    attempts: attempt,
                });
            }
            Err(error) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "Attempt failed; retrying"
                );
                sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn default_schedule_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let delays: Vec<u64> = (1..=4)
            .map(|attempt| policy.delay_after(attempt).as_secs())
            .collect();
        assert_eq!(delays, vec![2, 4, 8, 10]);
    }

    #[tokio::test]
    async fn succeeds_on_final_attempt() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::immediate(5), |_| async {
            let count = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if count < 5 {
                Err(format!("failure {count}"))
            } else {
                Ok("vector")
            }
        })
        .await;

        assert_eq!(result.expect("fifth attempt succeeds"), "vector");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::immediate(5), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(format!("failure {attempt}")) }
        })
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.attempts, 5);
        assert_eq!(error.last_error, "failure 5");
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn first_success_skips_retries() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&RetryPolicy::default(), |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(1)
        })
        .await;

        assert_eq!(result.expect("success"), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
