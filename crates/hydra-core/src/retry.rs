//! Retry policy and the `with_retry` helper.
//!
//! Mirrors the teacher's `dashflow::core::retry` module (referenced, but
//! not retrieved, from `dashflow-remote-node/src/client.rs`): a policy
//! struct built via `RetryPolicy::exponential(n)` / `default_jitter(n)`,
//! and a free function `with_retry` that re-invokes a fallible async
//! closure while the returned error reports itself retryable.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::Error;

/// Backoff strategy applied between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    Exponential { base: Duration, max: Duration },
}

/// Configures how many times, and with what spacing, a fallible operation
/// is retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Backoff,
    pub jitter: bool,
}

impl RetryPolicy {
    /// `n` attempts total (including the first), exponential backoff
    /// starting at 50ms and capped at 2s, no jitter.
    #[must_use]
    pub fn exponential(n: usize) -> Self {
        Self {
            max_attempts: n.max(1),
            backoff: Backoff::Exponential {
                base: Duration::from_millis(50),
                max: Duration::from_secs(2),
            },
            jitter: false,
        }
    }

    /// Same as [`Self::exponential`] but with +/-20% jitter applied to
    /// each computed delay, to avoid thundering-herd retries against a
    /// node that just recovered.
    #[must_use]
    pub fn default_jitter(n: usize) -> Self {
        Self {
            jitter: true,
            ..Self::exponential(n)
        }
    }

    /// A single fixed delay between attempts.
    #[must_use]
    pub fn fixed(n: usize, delay: Duration) -> Self {
        Self {
            max_attempts: n.max(1),
            backoff: Backoff::Fixed(delay),
            jitter: false,
        }
    }

    /// No retries: the operation is attempted exactly once.
    #[must_use]
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    fn delay_for(&self, attempt: usize) -> Duration {
        let base = match self.backoff {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => {
                let scaled = base.saturating_mul(1u32 << attempt.min(16) as u32);
                scaled.min(max)
            }
        };
        if !self.jitter || base.is_zero() {
            return base;
        }
        let factor = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_secs_f64(base.as_secs_f64() * factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_jitter(3)
    }
}

/// Runs `op` until it succeeds, the policy's attempt budget is exhausted,
/// or `op` returns an error that is not retryable (per [`Error::is_retryable`]).
/// Returns the last error encountered if every attempt fails.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= policy.max_attempts || !err.is_retryable() {
                    return Err(err);
                }
                tokio::time::sleep(policy.delay_for(attempt - 1)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn succeeds_without_retry() {
        let policy = RetryPolicy::exponential(3);
        let result: Result<i32, Error> = with_retry(&policy, || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn retries_transport_errors_up_to_budget() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));
        let calls = AtomicUsize::new(0);
        let result: Result<i32, Error> = with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::transport("boom")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable_errors() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));
        let calls = AtomicUsize::new(0);
        let result: Result<i32, Error> = with_retry(&policy, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(Error::no_healthy_nodes("none")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));
        let calls = AtomicUsize::new(0);
        let result = with_retry(&policy, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(Error::transport("flaky"))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
