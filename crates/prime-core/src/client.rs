//! HTTP client configuration, retry policy and response classification.
//!
//! Prime Infrastructure answers bursts of API calls with `503` (and sometimes `403`) instead of
//! queueing them, so requests are retried after a randomized pause within a bounded budget.

use crate::Error;
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

/// Default request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

/// Default connect timeout in seconds
pub const DEFAULT_CONNECT_TIMEOUT: u64 = 10;

// Connection pool settings

/// Default idle timeout for connection pools
pub const DEFAULT_POOL_IDLE_TIMEOUT: u64 = 90;

/// Default maximum idle connections per host
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 10;

// Retry settings

/// Default number of attempts granted to one logical request
pub const DEFAULT_RETRY_BUDGET: u32 = 5;

/// Default lower bound of the backoff pause in milliseconds
pub const DEFAULT_BACKOFF_MIN_MS: u64 = 1000;

/// Default upper bound of the backoff pause in milliseconds
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 5000;

/// Retry policy with uniformly jittered backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts granted before the request is abandoned
    pub budget: u32,

    /// Shortest pause between attempts
    pub min_delay: Duration,

    /// Longest pause between attempts
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            budget: DEFAULT_RETRY_BUDGET,
            min_delay: Duration::from_millis(DEFAULT_BACKOFF_MIN_MS),
            max_delay: Duration::from_millis(DEFAULT_BACKOFF_MAX_MS),
        }
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_budget(mut self, budget: u32) -> Self {
        self.budget = budget;
        self
    }

    /// Set the range the backoff pause is drawn from.
    #[must_use]
    pub const fn with_delay_range(mut self, min: Duration, max: Duration) -> Self {
        self.min_delay = min;
        self.max_delay = max;
        self
    }

    /// Bounds of the backoff pause, lower bound first.
    #[must_use]
    pub const fn delay_range(&self) -> (Duration, Duration) {
        (self.min_delay, self.max_delay)
    }

    /// Build the jittered backoff described by this policy.
    #[must_use]
    pub const fn backoff(&self) -> JitterBackoff {
        JitterBackoff::new(self.min_delay, self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of pauses between retry attempts.
pub trait Backoff: Send + Sync {
    /// Duration to wait before the next attempt.
    fn next_delay(&self) -> Duration;
}

/// Backoff drawing each pause uniformly from a fixed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterBackoff {
    min: Duration,
    max: Duration,
}

impl JitterBackoff {
    /// Create a backoff over `[min, max]`.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }
}

impl Backoff for JitterBackoff {
    fn next_delay(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// What the retry executor should do with a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the response to the caller
    Success,
    /// Pause and try again while budget remains
    Retryable,
    /// Give up
    Fatal(FatalKind),
}

/// Reason a response ends the request without retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// HTTP 401
    Unauthorized,
    /// Any other 4xx/5xx status
    Status(u16),
}

impl FatalKind {
    /// Build the error reported to the caller, using the response body as detail.
    #[must_use]
    pub fn into_error(self, message: String) -> Error {
        match self {
            Self::Unauthorized => {
                Error::AuthenticationFailed(format!("check credentials: {message}"))
            }
            Self::Status(status) => Error::RequestFailed { status, message },
        }
    }
}

/// Classify an HTTP status returned by Prime Infrastructure.
///
/// `503` and `403` are how the server signals too many concurrent API calls, so both are
/// retried. Anything outside the 4xx/5xx range is passed through untouched.
#[must_use]
pub fn classify_status(status: StatusCode) -> Outcome {
    match status {
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::FORBIDDEN => Outcome::Retryable,
        StatusCode::UNAUTHORIZED => Outcome::Fatal(FatalKind::Unauthorized),
        status if status.is_client_error() || status.is_server_error() => {
            Outcome::Fatal(FatalKind::Status(status.as_u16()))
        }
        _ => Outcome::Success,
    }
}

/// HTTP client configuration.
///
/// Configures HTTP client behavior including timeouts, retries, and connection pooling.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Retry policy
    pub retry_policy: RetryPolicy,

    /// Connection pool idle timeout
    pub pool_idle_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,

    /// Enable response compression
    pub enable_compression: bool,

    /// Keep the `JSESSIONID` cookie between calls
    pub enable_cookies: bool,
}

impl ClientConfig {
    /// Create a new client configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT),
            retry_policy: RetryPolicy::new(),
            pool_idle_timeout: Duration::from_secs(DEFAULT_POOL_IDLE_TIMEOUT),
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
            enable_compression: true,
            enable_cookies: true,
        }
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set connection pool idle timeout.
    #[must_use]
    pub const fn with_pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set maximum idle connections per host.
    #[must_use]
    pub const fn with_pool_max_idle(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Enable or disable compression.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Enable or disable the session cookie store.
    #[must_use]
    pub const fn with_cookies(mut self, enabled: bool) -> Self {
        self.enable_cookies = enabled;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_policy_new() {
        let policy = RetryPolicy::new();
        assert_eq!(policy.budget, 5);
        assert_eq!(policy.min_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_retry_policy_builder() {
        let policy = RetryPolicy::new()
            .with_budget(3)
            .with_delay_range(Duration::from_millis(10), Duration::from_millis(20));

        assert_eq!(policy.budget, 3);
        assert_eq!(
            policy.delay_range(),
            (Duration::from_millis(10), Duration::from_millis(20))
        );
    }

    #[test]
    fn test_retry_policy_default() {
        assert_eq!(RetryPolicy::default(), RetryPolicy::new());
    }

    #[test]
    fn test_jitter_backoff_stays_in_range() {
        let backoff = RetryPolicy::new().backoff();
        for _ in 0..200 {
            let delay = backoff.next_delay();
            assert!(delay >= Duration::from_secs(1), "{delay:?} below range");
            assert!(delay <= Duration::from_secs(5), "{delay:?} above range");
        }
    }

    #[test]
    fn test_jitter_backoff_degenerate_range() {
        let fixed = JitterBackoff::new(Duration::from_millis(7), Duration::from_millis(7));
        assert_eq!(fixed.next_delay(), Duration::from_millis(7));

        let inverted = JitterBackoff::new(Duration::from_millis(9), Duration::from_millis(3));
        assert_eq!(inverted.next_delay(), Duration::from_millis(9));
    }

    #[test]
    fn test_classify_success() {
        assert_eq!(classify_status(StatusCode::OK), Outcome::Success);
        assert_eq!(classify_status(StatusCode::CREATED), Outcome::Success);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), Outcome::Success);
        assert_eq!(classify_status(StatusCode::NOT_MODIFIED), Outcome::Success);
    }

    #[test]
    fn test_classify_retryable() {
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            Outcome::Retryable
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN), Outcome::Retryable);
    }

    #[test]
    fn test_classify_unauthorized() {
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            Outcome::Fatal(FatalKind::Unauthorized)
        );
        let err = FatalKind::Unauthorized.into_error("denied".to_string());
        assert!(matches!(err, Error::AuthenticationFailed(_)));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_classify_other_errors() {
        for code in [400_u16, 404, 405, 429, 500, 502, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(
                classify_status(status),
                Outcome::Fatal(FatalKind::Status(code)),
                "status {code}"
            );
        }

        assert_eq!(
            FatalKind::Status(404).into_error("nope".to_string()),
            Error::RequestFailed {
                status: 404,
                message: "nope".to_string(),
            }
        );
    }

    #[test]
    fn test_client_config_new() {
        let config = ClientConfig::new();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_REQUEST_TIMEOUT));
        assert_eq!(
            config.connect_timeout,
            Duration::from_secs(DEFAULT_CONNECT_TIMEOUT)
        );
        assert_eq!(config.retry_policy.budget, DEFAULT_RETRY_BUDGET);
        assert!(config.enable_compression);
        assert!(config.enable_cookies);
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(3))
            .with_retry_policy(RetryPolicy::new().with_budget(2))
            .with_pool_idle_timeout(Duration::from_secs(120))
            .with_pool_max_idle(20)
            .with_compression(false)
            .with_cookies(false);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.retry_policy.budget, 2);
        assert_eq!(config.pool_idle_timeout, Duration::from_secs(120));
        assert_eq!(config.pool_max_idle_per_host, 20);
        assert!(!config.enable_compression);
        assert!(!config.enable_cookies);
    }
}
