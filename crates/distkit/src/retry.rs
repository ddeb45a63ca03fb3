//! Retry logic with exponential backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// `attempt` is 1-indexed; `delay_secs` is the wait before the next try.
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64);
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_secs: u64) {
        log::warn!("Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {delay_secs}s...");
    }
}

/// Execute an operation with retry logic.
///
/// Only errors whose category is retryable are retried; anything else is
/// returned on the first failure.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let mut last_error: Option<Error> = None;

    for attempt in 0..config.max_attempts.max(1) {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                if attempt + 1 >= config.max_attempts {
                    last_error = Some(e);
                    break;
                }

                let delay = config.delay_for_attempt(attempt);
                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, config.max_attempts, &e, delay.as_secs());
                }
                thread::sleep(delay);

                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| Error::Other("retry exhausted".to_string())))
}
