//! Explicit retry combinator.
//!
//! Retries are a policy plus a classifier: each failed attempt is mapped
//! to a [`Decision`], and the combinator either sleeps and retries or
//! hands the error back. Keeping this a plain function makes the backoff
//! behavior testable without any network code.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry { delay: Duration },
    GiveUp,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Per-attempt delay cap.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// `2^attempt + 1` seconds, capped. `attempt` is zero-based.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt).saturating_add(1);
        Duration::from_secs(exp).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, the classifier gives up, or attempts are
/// exhausted. The classifier sees the error and the zero-based attempt
/// index; returning [`Decision::Retry`] chooses the sleep before the next
/// attempt.
pub async fn retry<T, E, Op, Fut, Classify>(
    policy: RetryPolicy,
    classify: Classify,
    mut op: Op,
) -> Result<T, E>
where
    Op: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Classify: Fn(&E, u32, &RetryPolicy) -> Decision,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt + 1 >= policy.max_attempts {
                    return Err(err);
                }
                match classify(&err, attempt, &policy) {
                    Decision::GiveUp => return Err(err),
                    Decision::Retry { delay } => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            delay_secs = delay.as_secs(),
                            "retrying after error: {err}"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                }
            }
        }
    }
}

/// Classifier for provider errors: transient failures back off, hard
/// client errors and content blocks give up immediately.
pub fn classify_provider_error(
    err: &crate::error::ClientError,
    attempt: u32,
    policy: &RetryPolicy,
) -> Decision {
    if err.is_transient() {
        Decision::Retry {
            delay: policy.backoff_delay(attempt),
        }
    } else {
        Decision::GiveUp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(3));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(9));
        assert_eq!(policy.backoff_delay(10), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_retry_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ClientError> = retry(
            RetryPolicy::default(),
            classify_provider_error,
            |_attempt| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ClientError::Http {
                            status: 503,
                            message: "unavailable".into(),
                        })
                    } else {
                        Ok(7)
                    }
                }
            },
        )
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hard_errors_give_up_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, ClientError> = retry(
            RetryPolicy::default(),
            classify_provider_error,
            |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ClientError::Http {
                        status: 400,
                        message: "invalid argument".into(),
                    })
                }
            },
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy {
            max_attempts: 4,
            ..Default::default()
        };
        let result: Result<u32, ClientError> =
            retry(policy, classify_provider_error, |_attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ClientError::Transport("connection reset".into())) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }
}
