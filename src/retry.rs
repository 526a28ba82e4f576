use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Retry decision returned by the error classifier callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Retry,
    Abort,
}

/// Fixed-wait retry policy.
///
/// SharePoint's throttling doesn't get friendlier with exponential backoff,
/// so every retry waits the same `wait_secs`. `max_attempts: None` retries
/// forever.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub wait_secs: u64,
    pub max_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            wait_secs: 60,
            max_attempts: None,
        }
    }
}

impl RetryConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Why [`retry_with_wait`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The classifier said the error is not worth retrying.
    Aborted(E),
    /// `max_attempts` attempts all failed; holds the last error.
    Exhausted { attempts: u32, last: E },
    /// Shutdown was requested while waiting to retry.
    Cancelled(E),
}

/// Sleep for `duration` unless `shutdown` fires first. Returns `false` if
/// the sleep was cut short.
pub async fn sleep_or_cancel(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = shutdown.cancelled() => false,
    }
}

/// Retry an async operation with a fixed wait between attempts.
///
/// - `config`: wait duration and optional attempt budget
/// - `shutdown`: cancels the wait between attempts
/// - `classifier`: inspects an error and returns `Retry` or `Abort`; also the
///   place to log why an attempt failed
/// - `operation`: the async closure to retry, re-run from scratch each time
pub async fn retry_with_wait<F, Fut, T, E, C>(
    config: &RetryConfig,
    shutdown: &CancellationToken,
    classifier: C,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: Fn(&E) -> RetryAction,
    E: std::fmt::Display,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let err = match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => e,
        };

        if classifier(&err) == RetryAction::Abort {
            return Err(RetryError::Aborted(err));
        }
        if config.attempts_exhausted(attempts) {
            return Err(RetryError::Exhausted {
                attempts,
                last: err,
            });
        }
        if shutdown.is_cancelled() {
            return Err(RetryError::Cancelled(err));
        }

        tracing::info!(attempt = attempts, "Sleep for {} seconds before retrying", config.wait_secs);
        if !sleep_or_cancel(config.wait(), shutdown).await {
            return Err(RetryError::Cancelled(err));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn config(wait_secs: u64, max_attempts: Option<u32>) -> RetryConfig {
        RetryConfig {
            wait_secs,
            max_attempts,
        }
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.wait_secs, 60);
        assert!(config.max_attempts.is_none());
        assert_eq!(config.wait(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retry_succeeds_first_try() {
        let token = CancellationToken::new();
        let result: Result<i32, RetryError<String>> =
            retry_with_wait(&config(0, None), &token, |_| RetryAction::Retry, || async {
                Ok(42)
            })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retry_abort_on_non_retryable() {
        let token = CancellationToken::new();
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<i32, RetryError<String>> = retry_with_wait(
            &config(0, None),
            &token,
            |_| RetryAction::Abort,
            || {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Aborted(e)) if e == "fatal"));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unbounded_retry_until_success() {
        let token = CancellationToken::new();
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<i32, RetryError<String>> = retry_with_wait(
            &config(0, None),
            &token,
            |_| RetryAction::Retry,
            || {
                let cc = cc.clone();
                async move {
                    let n = cc.fetch_add(1, Ordering::SeqCst);
                    if n < 25 {
                        Err("transient".to_string())
                    } else {
                        Ok(99)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 26);
    }

    #[tokio::test]
    async fn test_retry_exhausted() {
        let token = CancellationToken::new();
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<i32, RetryError<String>> = retry_with_wait(
            &config(0, Some(3)),
            &token,
            |_| RetryAction::Retry,
            || {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err("still failing".to_string())
                }
            },
        )
        .await;
        match result {
            Err(RetryError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(last, "still failing");
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_exactly_configured_duration() {
        let token = CancellationToken::new();
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let start = tokio::time::Instant::now();
        let result: Result<(), RetryError<String>> = retry_with_wait(
            &config(30, None),
            &token,
            |_| RetryAction::Retry,
            || {
                let cc = cc.clone();
                async move {
                    if cc.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("429".to_string())
                    } else {
                        Ok(())
                    }
                }
            },
        )
        .await;
        assert!(result.is_ok());
        // Two failures, two waits of 30s each
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(60) && elapsed < Duration::from_secs(61));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_after_last_attempt() {
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();
        let result: Result<(), RetryError<String>> = retry_with_wait(
            &config(30, Some(2)),
            &token,
            |_| RetryAction::Retry,
            || async { Err("429".to_string()) },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 2, .. })));
        // Only the wait between the two attempts
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_wait() {
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            canceller.cancel();
        });

        let start = tokio::time::Instant::now();
        let result: Result<(), RetryError<String>> = retry_with_wait(
            &config(3600, None),
            &token,
            |_| RetryAction::Retry,
            || async { Err("busy".to_string()) },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Cancelled(_))));
        assert!(start.elapsed() < Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_wait() {
        let token = CancellationToken::new();
        token.cancel();
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = call_count.clone();
        let result: Result<(), RetryError<String>> = retry_with_wait(
            &config(3600, None),
            &token,
            |_| RetryAction::Retry,
            || {
                let cc = cc.clone();
                async move {
                    cc.fetch_add(1, Ordering::SeqCst);
                    Err("busy".to_string())
                }
            },
        )
        .await;
        assert!(matches!(result, Err(RetryError::Cancelled(_))));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }
}
