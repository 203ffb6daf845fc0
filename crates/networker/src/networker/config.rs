//! Networker configuration.

use std::time::Duration;

use crate::cache::CacheConfig;
use crate::error::{ErrorCase, NetworkError, TransportError};
use crate::logger::LogLevel;

/// Which failures are worth another attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Retry transport failures, timeouts, empty responses and server
    /// errors. Client errors, redirections, decoding failures and rejected
    /// URLs fail fast.
    #[default]
    TransientOnly,
    /// Retry every failure except cancellation and [`ErrorCase::Locked`].
    Always,
}

impl RetryPolicy {
    /// Whether `error` may be retried under this policy.
    ///
    /// `transport` is the raw transport failure behind the error, if any. It
    /// separates a refused connection (transient) from a malformed URL, which
    /// classify to the same case.
    pub fn allows(self, error: &NetworkError, transport: Option<&TransportError>) -> bool {
        match error.case() {
            ErrorCase::RequestCanceled | ErrorCase::Locked => false,
            _ if self == Self::Always => true,
            ErrorCase::TimeOut
            | ErrorCase::NoData
            | ErrorCase::ServerError(_)
            | ErrorCase::Network(_) => true,
            ErrorCase::InvalidUrl(_) => matches!(
                transport,
                Some(TransportError::CannotConnect(_) | TransportError::CannotFindHost(_))
            ),
            ErrorCase::Unknown { status, .. } => status.is_none_or(|status| status >= 500),
            _ => false,
        }
    }
}

/// Retry behavior for failed calls.
///
/// Retries use a fixed delay between attempts: no backoff, no jitter.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Whether failed calls are retried at all.
    pub enabled: bool,
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before every retry.
    pub delay: Duration,
    /// Which failures are retried.
    pub policy: RetryPolicy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 3,
            delay: Duration::from_secs(1),
            policy: RetryPolicy::default(),
        }
    }
}

impl RetryConfig {
    /// A configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether a call that just failed on retry number `retries_so_far`
    /// should be attempted again.
    pub fn should_retry(
        &self,
        retries_so_far: u32,
        error: &NetworkError,
        transport: Option<&TransportError>,
    ) -> bool {
        self.enabled && retries_so_far < self.max_retries && self.policy.allows(error, transport)
    }
}

/// Top-level networker configuration.
#[derive(Clone, Debug, Default)]
pub struct NetworkerConfig {
    /// Retry behavior.
    pub retry: RetryConfig,
    /// Response cache behavior.
    pub cache: CacheConfig,
    /// Verbosity of the default logger.
    pub log_level: LogLevel,
    /// Silence the default logger entirely.
    pub silent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(case: ErrorCase) -> NetworkError {
        NetworkError::new(case)
    }

    #[test]
    fn test_defaults() {
        let config = NetworkerConfig::default();
        assert!(config.retry.enabled);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.delay, Duration::from_secs(1));
        assert!(!config.cache.enabled);
        assert_eq!(config.log_level, LogLevel::Info);
    }

    #[test]
    fn test_transient_only_policy() {
        let policy = RetryPolicy::TransientOnly;
        assert!(policy.allows(&error(ErrorCase::TimeOut), None));
        assert!(policy.allows(&error(ErrorCase::ServerError(String::new())), None));
        assert!(policy.allows(&error(ErrorCase::unknown()), None));
        assert!(!policy.allows(&error(ErrorCase::NotFound(String::new())), None));
        assert!(!policy.allows(&error(ErrorCase::DecodingError(String::new())), None));
        assert!(!policy.allows(
            &error(ErrorCase::Unknown {
                status: Some(418),
                message: String::new()
            }),
            None
        ));

        let refused = TransportError::CannotConnect("refused".into());
        let bad = TransportError::BadUrl("bad".into());
        let case = error(ErrorCase::InvalidUrl("x".into()));
        assert!(policy.allows(&case, Some(&refused)));
        assert!(!policy.allows(&case, Some(&bad)));
    }

    #[test]
    fn test_cancellation_is_never_retried() {
        for policy in [RetryPolicy::TransientOnly, RetryPolicy::Always] {
            assert!(!policy.allows(&error(ErrorCase::RequestCanceled), None));
            assert!(!policy.allows(&error(ErrorCase::Locked), None));
        }
        assert!(RetryPolicy::Always.allows(&error(ErrorCase::BadRequest(String::new())), None));
    }

    #[test]
    fn test_retry_budget() {
        let config = RetryConfig {
            max_retries: 2,
            ..RetryConfig::default()
        };
        let timeout = error(ErrorCase::TimeOut);
        assert!(config.should_retry(0, &timeout, None));
        assert!(config.should_retry(1, &timeout, None));
        assert!(!config.should_retry(2, &timeout, None));
        assert!(!RetryConfig::disabled().should_retry(0, &timeout, None));
    }
}
