//! Retry logic with exponential backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::{Duration, Instant};

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Current attempt number (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::warn!(
            "Attempt {}/{} failed: {}. Retrying in {}ms...",
            attempt,
            max_attempts,
            error,
            delay.as_millis()
        );
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation if it returns a retryable error, using exponential
/// backoff between attempts. If the next backoff would overrun `deadline`,
/// the last error is returned as a timeout instead of sleeping.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    deadline: Option<Instant>,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.attempts();
    let mut attempt = 0;

    loop {
        let err = match operation() {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        // If error is not retryable, or this was the last attempt, give up
        if !err.is_retryable() || attempt + 1 >= max_attempts {
            return Err(err);
        }

        let delay = config.delay_for_attempt(attempt);
        if !fits_before(deadline, delay) {
            return Err(err.into_timeout());
        }

        if let Some(cb) = callback {
            cb.on_retry(attempt + 1, max_attempts, &err, delay);
        }

        thread::sleep(delay);
        attempt += 1;
    }
}

/// Sleep for `delay` unless that would overrun `deadline`.
///
/// Returns `false` without sleeping when the deadline is too close.
pub fn sleep_within(deadline: Option<Instant>, delay: Duration) -> bool {
    if !fits_before(deadline, delay) {
        return false;
    }
    thread::sleep(delay);
    true
}

fn fits_before(deadline: Option<Instant>, delay: Duration) -> bool {
    deadline.is_none_or(|deadline| {
        Instant::now()
            .checked_add(delay)
            .is_some_and(|end| end < deadline)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::types::SchemaScope;
    use std::cell::Cell;
    use std::rc::Rc;

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig::fixed(max_attempts, Duration::from_millis(1))
    }

    fn network_error() -> Error {
        Error::remote(
            "fetch",
            &SchemaScope::Default,
            None,
            RemoteError::transient("timeout"),
        )
    }

    #[test]
    fn test_with_retry_success_first_try() {
        let config = RetryConfig::fixed(1, Duration::ZERO);
        let result = with_retry(&config, None, None, || Ok::<_, Error>(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_with_retry_non_retryable_error() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = with_retry(&quick(3), None, None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(Error::remote(
                "fetch",
                &SchemaScope::Default,
                None,
                RemoteError::from_status(401, "unauthorized"),
            ))
        });

        assert!(result.is_err());
        // Should only try once since auth failures are permanent
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_with_retry_eventual_success() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result = with_retry(&quick(3), None, None, || {
            let current = attempts_clone.get();
            attempts_clone.set(current + 1);
            if current < 2 { Err(network_error()) } else { Ok(42) }
        });

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_all_attempts_fail() {
        let attempts = Rc::new(Cell::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = with_retry(&quick(3), None, None, || {
            attempts_clone.set(attempts_clone.get() + 1);
            Err(network_error())
        });

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(attempts.get(), 3);
    }

    #[test]
    fn test_with_retry_stops_at_deadline() {
        let config = RetryConfig::fixed(10, Duration::from_secs(60));
        let deadline = Some(Instant::now() + Duration::from_millis(50));

        let result: Result<()> = with_retry(&config, deadline, None, || Err(network_error()));

        assert!(matches!(
            result,
            Err(Error::Timeout { stage: "fetch", .. })
        ));
    }

    #[test]
    fn test_callback_invoked() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingCallback(Arc<AtomicU32>);
        impl RetryCallback for CountingCallback {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: Duration) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let callback_count = Arc::new(AtomicU32::new(0));
        let callback = CountingCallback(callback_count.clone());

        let _: Result<()> = with_retry(&quick(3), None, Some(&callback), || Err(network_error()));

        // Callback should be called for each retry (not the first attempt, not the last)
        assert_eq!(callback_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_sleep_within() {
        assert!(sleep_within(None, Duration::from_millis(1)));
        let close = Some(Instant::now() + Duration::from_millis(5));
        assert!(!sleep_within(close, Duration::from_secs(10)));
    }
}
