use std::{io, thread, time::Duration};

use tracing::debug;

/// Bounded retry with exponential backoff around a filesystem operation,
/// absorbing transient permission and lock errors from external processes
/// (antivirus scanners, indexers, sync agents).
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            base_delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
        }
    }

    /// Runs `op` up to the configured attempt count. A retryable error sleeps
    /// `base_delay * 2^attempt` and tries again; any other error aborts
    /// immediately. Exhaustion returns the last observed error unchanged.
    pub fn run<T, F>(&self, mut op: F) -> io::Result<T>
    where
        F: FnMut() -> io::Result<T>,
    {
        let mut last_err = None;
        for attempt in 0..self.attempts {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if is_retryable(&err) => {
                    debug!(attempt, error = %err, "retrying transient filesystem error");
                    last_err = Some(err);
                    if attempt + 1 < self.attempts {
                        thread::sleep(self.base_delay * 2_u32.saturating_pow(attempt));
                    }
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| io::Error::other("retry budget exhausted")))
    }
}

/// Errors that cannot heal with time abort immediately; everything else is
/// treated as transient contention and retried.
fn is_retryable(err: &io::Error) -> bool {
    !matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidData
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::AlreadyExists
    )
}
