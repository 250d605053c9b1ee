//! Retry logic for outbound channel sends.
//!
//! Only a busy outbox is worth retrying: every other send result means the
//! phone is unreachable or refused the message, and trying again a few
//! milliseconds later will not change that.
//!
//! Retries are timer-driven. Between attempts the task sleeps on the tokio
//! timer, which yields to the runtime instead of stalling the thread, while
//! the number of attempts and the delay between them stay exactly as
//! configured.
//!
//! # Example
//!
//! ```
//! use quickhue_core::{RetryConfig, with_retry, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! // Five attempts, 75 ms apart
//! let config = RetryConfig::for_toggle();
//!
//! with_retry(&config, "toggle", || async {
//!     // Your send here
//!     Ok::<_, Error>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Fixed-delay retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first (1 means no retries).
    pub max_attempts: u32,
    /// Delay between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

impl RetryConfig {
    /// Create a config with the given number of attempts and delay.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    // ==================== Per-Command Presets ====================
    //
    // - Toggle: a lost toggle has no lasting effect, but the user pressed a
    //   button and expects the light to change, so try harder.
    // - Brightness: values arrive in bursts while a button is held; a stale
    //   value retried too long would overwrite a newer one.

    /// Retry configuration for the toggle command: 5 attempts, 75 ms apart.
    pub fn for_toggle() -> Self {
        Self::new(5, Duration::from_millis(75))
    }

    /// Retry configuration for brightness changes: 3 attempts, 50 ms apart.
    pub fn for_brightness() -> Self {
        Self::new(3, Duration::from_millis(50))
    }

    // ==================== Builder Methods ====================

    /// Set the total number of attempts.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay between attempts.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Validate the config and return an error if it cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::invalid_config("max_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Execute an async send with retry logic.
///
/// The operation is invoked afresh for every attempt, so it should rebuild
/// whatever it sends. Attempts run strictly one after another.
///
/// # Returns
///
/// The result of the first successful attempt, the first non-retryable
/// error, or the last busy error once all attempts are used up.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("{} succeeded on attempt {}", operation_name, attempt);
                }
                return Ok(result);
            }
            Err(e) if !is_retryable(&e) => return Err(e),
            Err(e) => {
                if attempt >= max_attempts {
                    warn!(
                        "{} giving up after {} attempts: {}",
                        operation_name, attempt, e
                    );
                    return Err(e);
                }

                let delay = config.delay;
                warn!(
                    "{} failed (attempt {}/{}), retrying in {:?}",
                    operation_name, attempt, max_attempts, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Check if an error is retryable.
fn is_retryable(error: &Error) -> bool {
    error.is_busy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_message::AppMessageResult;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn busy() -> Error {
        Error::channel("test", AppMessageResult::Busy)
    }

    #[test]
    fn test_presets() {
        let toggle = RetryConfig::for_toggle();
        assert_eq!(toggle.max_attempts, 5);
        assert_eq!(toggle.delay, Duration::from_millis(75));

        let brightness = RetryConfig::for_brightness();
        assert_eq!(brightness.max_attempts, 3);
        assert_eq!(brightness.delay, Duration::from_millis(50));

        assert_eq!(RetryConfig::none().max_attempts, 1);
    }

    #[test]
    fn test_builder() {
        let config = RetryConfig::default()
            .max_attempts(7)
            .delay(Duration::from_millis(20));
        assert_eq!(config, RetryConfig::new(7, Duration::from_millis(20)));
    }

    #[test]
    fn test_validate() {
        assert!(RetryConfig::for_toggle().validate().is_ok());
        assert!(RetryConfig::none().validate().is_ok());
        assert!(RetryConfig::default().max_attempts(0).validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_attempts() {
        let config = RetryConfig::new(3, Duration::from_millis(40));
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let start = tokio::time::Instant::now();
        let _ = with_retry(&config, "test", || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(busy())
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(80));
        assert!(elapsed < Duration::from_millis(85));
    }

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(&busy()));
        assert!(!is_retryable(&Error::channel(
            "test",
            AppMessageResult::SendTimeout
        )));
        assert!(!is_retryable(&Error::InvalidBrightness(120)));
    }

    #[tokio::test]
    async fn test_with_retry_immediate_success() {
        let config = RetryConfig::for_toggle();
        let result = with_retry(&config, "test", || async { Ok::<_, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_eventual_success() {
        let config = RetryConfig::for_toggle();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let start = tokio::time::Instant::now();
        let result: Result<i32> = with_retry(&config, "test", || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                let count = attempts.fetch_add(1, Ordering::SeqCst);
                if count < 4 { Err(busy()) } else { Ok(42) }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(4 * 75));
        assert!(elapsed < Duration::from_millis(4 * 75 + 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_all_busy() {
        let config = RetryConfig::for_brightness();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<i32> = with_retry(&config, "test", || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(busy())
            }
        })
        .await;

        assert!(result.unwrap_err().is_busy());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_non_retryable_error() {
        let config = RetryConfig::for_toggle();
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let result: Result<i32> = with_retry(&config, "test", || {
            let attempts = Arc::clone(&attempts_clone);
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(Error::channel("test", AppMessageResult::NotConnected))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let config = RetryConfig::none().max_attempts(0);
        let counter = AtomicU32::new(0);
        let attempts = &counter;
        let _ = with_retry(&config, "test", || async move {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(busy())
        })
        .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
