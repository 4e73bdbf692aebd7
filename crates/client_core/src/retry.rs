use std::{future::Future, time::Duration};

use shared::error::GenerationError;
use tracing::warn;

pub const DEFAULT_MAX_RETRIES: usize = 2;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Fixed-delay retry for transient service failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: usize, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Runs `attempt` until it succeeds, fails with a non-transient error, or
    /// the retry budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, GenerationError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let mut retries_left = self.max_retries;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if retries_left > 0 && err.is_transient() => {
                    warn!(
                        operation,
                        status = ?err.status(),
                        retries_left,
                        error = %err,
                        "generation: transient failure; retrying"
                    );
                    retries_left -= 1;
                    tokio::time::sleep(self.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn instant() -> RetryPolicy {
        RetryPolicy::new(2, Duration::ZERO)
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = instant()
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(GenerationError::from_failure(Some(503), "overloaded"))
                } else {
                    Ok(n)
                }
            })
            .await;
        assert_eq!(result.expect("third attempt succeeds"), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_two_retries() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), _> = instant()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::from_failure(Some(500), "internal"))
            })
            .await;
        assert!(result.expect_err("exhausted").is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_permanent_failures() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<(), _> = instant()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GenerationError::parse("bad json"))
            })
            .await;
        assert!(matches!(result, Err(GenerationError::Parse { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_the_fixed_delay_between_attempts() {
        let started = tokio::time::Instant::now();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let _ = RetryPolicy::default()
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GenerationError::from_failure(Some(503), "busy"))
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(4));
    }
}
