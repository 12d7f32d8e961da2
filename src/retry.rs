//! Retry policy for start-up connectivity.
//!
//! Fixed backoff: every retry waits the same interval.

use crate::config::ConnectionSettings;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(settings: &ConnectionSettings) -> Self {
        Self {
            max_retries: settings.retries,
            interval: settings.retry_interval,
        }
    }

    /// Total attempts, the first one included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// `attempt` is 1-based: attempt 1 is the first try.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts()
    }

    /// Runs `op` until it succeeds or attempts run out, sleeping `interval`
    /// between tries. Returns the last error and the number of attempts made.
    pub fn run<T, E, F>(&self, mut op: F, mut on_retry: impl FnMut(u32, &E)) -> Result<T, (E, u32)>
    where
        F: FnMut() -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(attempt) => {
                    on_retry(attempt, &e);
                    std::thread::sleep(self.interval);
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            interval: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            interval: Duration::ZERO,
        }
    }

    #[test]
    fn test_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_should_retry_boundary() {
        let policy = instant(2);
        assert!(policy.should_retry(1));
        assert!(policy.should_retry(2));
        assert!(!policy.should_retry(3));
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let policy = instant(3);
        let mut calls = 0;
        let mut retried = Vec::new();

        let result = policy.run(
            || {
                calls += 1;
                if calls < 3 {
                    Err("busy")
                } else {
                    Ok(calls)
                }
            },
            |attempt, _| retried.push(attempt),
        );

        assert_eq!(result, Ok(3));
        assert_eq!(retried, vec![1, 2]);
    }

    #[test]
    fn test_gives_up_after_bounded_attempts() {
        let policy = instant(2);
        let mut calls = 0;

        let result: Result<(), _> = policy.run(
            || {
                calls += 1;
                Err("down")
            },
            |_, _| {},
        );

        assert_eq!(result, Err(("down", 3)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_zero_retries_means_single_attempt() {
        let policy = instant(0);
        let result: Result<(), _> = policy.run(|| Err(()), |_, _| panic!("must not retry"));
        assert_eq!(result, Err(((), 1)));
    }
}
