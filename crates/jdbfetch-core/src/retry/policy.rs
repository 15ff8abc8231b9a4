use std::time::Duration;

/// High-level classification of an error for retry purposes.
///
/// Callers map HTTP status codes, curl errors and I/O failures into these kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation timed out (connect/read/low-speed).
    Timeout,
    /// Server asked us to slow down (e.g. 429, 503).
    Throttled,
    /// Network-level failure (connection reset, DNS, short body, etc.).
    Connection,
    /// HTTP status that is retryable but not strictly throttling (5xx).
    Http5xx(u16),
    /// Local positioned write failed.
    Storage,
    /// Anything that will not improve by retrying (4xx, cancelled, range ignored).
    Other,
}

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this error.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Bounded exponential backoff, applied per chunk.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts per chunk (including the first).
    pub max_attempts: u32,
    /// Base delay for backoff.
    pub base_delay: Duration,
    /// Upper bound on backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Decide what to do after attempt number `attempt` (1-based) failed with `kind`.
    /// Returns `RetryDecision::NoRetry` once `max_attempts` is reached.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::NoRetry;
        }

        match kind {
            ErrorKind::Other => RetryDecision::NoRetry,
            ErrorKind::Timeout
            | ErrorKind::Connection
            | ErrorKind::Throttled
            | ErrorKind::Http5xx(_)
            | ErrorKind::Storage => {
                // base * 2^(attempt-1), capped.
                let exp = 1u32 << attempt.saturating_sub(1).min(16);
                let raw = self.base_delay.saturating_mul(exp);
                RetryDecision::RetryAfter(raw.min(self.max_delay))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delay(p: &RetryPolicy, attempt: u32) -> Duration {
        match p.decide(attempt, ErrorKind::Timeout) {
            RetryDecision::RetryAfter(d) => d,
            RetryDecision::NoRetry => panic!("expected retry at attempt {}", attempt),
        }
    }

    #[test]
    fn no_retry_for_other() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Other), RetryDecision::NoRetry);
    }

    #[test]
    fn exponential_backoff_doubles_then_caps() {
        let p = RetryPolicy {
            max_attempts: 40,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(delay(&p, 1), Duration::from_millis(250));
        assert_eq!(delay(&p, 2), Duration::from_millis(500));
        assert_eq!(delay(&p, 3), Duration::from_secs(1));
        assert_eq!(delay(&p, 10), Duration::from_secs(30));
        assert_eq!(delay(&p, 39), Duration::from_secs(30));
    }

    #[test]
    fn respects_max_attempts() {
        let p = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        assert!(matches!(
            p.decide(1, ErrorKind::Throttled),
            RetryDecision::RetryAfter(_)
        ));
        assert!(matches!(
            p.decide(2, ErrorKind::Storage),
            RetryDecision::RetryAfter(_)
        ));
        assert_eq!(p.decide(3, ErrorKind::Throttled), RetryDecision::NoRetry);
    }

    #[test]
    fn single_attempt_never_retries() {
        let p = RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        };
        assert_eq!(p.decide(1, ErrorKind::Connection), RetryDecision::NoRetry);
    }
}
