//! Webhook delivery with exponential backoff retry logic.
//!
//! [`RetryNotify`] is a decorator over any [`Notify`] implementation that
//! retries transient delivery failures (rate limiting, 5xx, network errors)
//! with exponential backoff and jitter. Permanent failures such as an unknown
//! webhook are returned immediately.
//!
//! # Retry Strategy
//!
//! - Maximum 3 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to every delay
//!
//! When retries are exhausted the error reaches the poll loop, which abandons
//! the cycle without advancing the dedup cursor, so the post is offered again
//! on the next cycle.

use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

use crate::error::Result;
use crate::models::WebhookMessage;
use crate::outputs::webhook::Notify;

/// Delay before retry number `attempt` (1-based):
/// `min(base * 2^(attempt-1), max)`.
pub fn exponential_delay(base: StdDuration, attempt: u32, max: StdDuration) -> StdDuration {
    let factor = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(factor).min(max)
}

/// Wrapper that adds exponential backoff retry logic to any [`Notify`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryNotify<T> {
    /// The underlying notifier to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: u32,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryNotify<T>
where
    T: Notify,
{
    /// Create a new retry wrapper around an existing [`Notify`] implementation.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let webhook = WebhookNotifier::new(url, Duration::from_secs(30))?;
    /// let notifier = RetryNotify::new(webhook, 3, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: u32, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryNotify<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryNotify")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Notify for RetryNotify<T>
where
    T: Notify,
{
    #[instrument(level = "info", skip_all)]
    async fn send(&self, message: &WebhookMessage) -> Result<()> {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.send(message).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_retryable() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            retryable = e.is_retryable(),
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "send() giving up"
                        );
                        return Err(e);
                    }

                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = exponential_delay(self.base_delay, attempt, self.max_delay)
                        + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "send() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Notifier that replays scripted results and counts calls.
    struct Scripted {
        results: RefCell<VecDeque<Result<()>>>,
        calls: RefCell<u32>,
    }

    impl Scripted {
        fn new(results: Vec<Result<()>>) -> Self {
            Self {
                results: RefCell::new(results.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl Notify for Scripted {
        async fn send(&self, _message: &WebhookMessage) -> Result<()> {
            *self.calls.borrow_mut() += 1;
            self.results.borrow_mut().pop_front().unwrap_or(Ok(()))
        }
    }

    fn message() -> WebhookMessage {
        WebhookMessage {
            content: None,
            embeds: vec![],
        }
    }

    #[test]
    fn test_exponential_delay() {
        let base = StdDuration::from_secs(1);
        let max = StdDuration::from_secs(30);
        assert_eq!(exponential_delay(base, 1, max), StdDuration::from_secs(1));
        assert_eq!(exponential_delay(base, 2, max), StdDuration::from_secs(2));
        assert_eq!(exponential_delay(base, 4, max), StdDuration::from_secs(8));
        assert_eq!(exponential_delay(base, 6, max), max);
        assert_eq!(exponential_delay(base, 200, max), max);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let inner = Scripted::new(vec![
            Err(AppError::notification(Some(429), "rate limited")),
            Ok(()),
        ]);
        let notifier = RetryNotify::new(inner, 3, StdDuration::from_millis(1));
        notifier.send(&message()).await.unwrap();
        assert_eq!(*notifier.inner.calls.borrow(), 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let inner = Scripted::new(vec![Err(AppError::notification(Some(401), "bad token"))]);
        let notifier = RetryNotify::new(inner, 3, StdDuration::from_millis(1));
        let err = notifier.send(&message()).await.unwrap_err();
        assert!(matches!(err, AppError::Notification { status: Some(401), .. }));
        assert_eq!(*notifier.inner.calls.borrow(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = Scripted::new(
            (0..10)
                .map(|_| Err(AppError::notification(Some(503), "unavailable")))
                .collect(),
        );
        let notifier = RetryNotify::new(inner, 2, StdDuration::from_millis(1));
        assert!(notifier.send(&message()).await.is_err());
        assert_eq!(*notifier.inner.calls.borrow(), 3);
    }
}
