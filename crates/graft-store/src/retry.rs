//! Bounded retries with linear backoff

use std::future::Future;
use std::time::Duration;

use graft_core::error_chain;
use tracing::warn;

use crate::error::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Attempt `n` (1-based) is followed by a pause of `n * backoff`.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }

    /// Run `operation` until it succeeds, fails permanently, or the
    /// attempts are used up.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(StoreError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
                Err(e) => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label,
                        attempt,
                        self.max_attempts,
                        delay,
                        error_chain(&e)
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> StoreError {
        StoreError::Status {
            status: 503,
            body: "busy".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures_with_linear_backoff() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let started = tokio::time::Instant::now();

        let result = policy
            .run("select", move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1 * 2s + 2 * 2s
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(started.elapsed() < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(10));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = policy
            .run("select", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;

        assert!(matches!(result, Err(StoreError::RetriesExhausted { attempts: 2, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_failures_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = policy
            .run("select", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Status {
                    status: 400,
                    body: "syntax error".to_string(),
                })
            })
            .await;

        assert!(matches!(result, Err(StoreError::Status { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
