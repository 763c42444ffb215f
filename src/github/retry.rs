//! Retry configuration and policy helpers for GraphQL requests.

use crate::error::SearchError;
use backon::ExponentialBuilder;
use tokio::time::Duration;

/// Configuration for retrying failed GraphQL requests.
#[derive(Clone, Copy, Debug)]
pub struct RetryConfig {
    /// Total number of attempts including the initial request.
    pub attempts: usize,
    /// Base delay for the exponential backoff.
    pub base_delay: Duration,
    /// Whether to jitter the backoff delay.
    pub jitter: bool,
    /// Total deadline applied to each HTTP exchange.
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(200),
            jitter: true,
            request_timeout: Duration::from_secs(30),
        }
    }
}

pub(super) fn build_retry_builder(config: RetryConfig) -> ExponentialBuilder {
    let builder = ExponentialBuilder::default()
        .with_min_delay(config.base_delay)
        .with_max_times(config.attempts);
    if config.jitter {
        builder.with_jitter()
    } else {
        builder
    }
}

/// Only transient failures are worth a second attempt; semantic errors
/// (not-found, rate limits, token problems) repeat identically.
pub(super) fn should_retry(err: &SearchError) -> bool {
    match err {
        SearchError::Network(_) | SearchError::Timeout => true,
        SearchError::Provider { status, .. } => status.is_some_and(|s| s >= 500),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{should_retry, RetryConfig};
    use crate::error::SearchError;
    use rstest::rstest;

    #[rstest]
    #[case(SearchError::Network("connection reset".into()), true)]
    #[case(SearchError::Timeout, true)]
    #[case(
        SearchError::Provider { message: "bad gateway".into(), status: Some(502), details: None },
        true
    )]
    #[case(
        SearchError::Provider { message: "odd".into(), status: Some(418), details: None },
        false
    )]
    #[case(
        SearchError::Provider { message: "no status".into(), status: None, details: None },
        false
    )]
    #[case(SearchError::UserNotFound, false)]
    #[case(SearchError::rate_limited_upstream(60), false)]
    #[case(SearchError::InvalidToken, false)]
    #[case(SearchError::InsufficientScopes, false)]
    fn retry_policy(#[case] err: SearchError, #[case] expected: bool) {
        assert_eq!(should_retry(&err), expected);
    }

    #[test]
    fn defaults_are_modest() {
        let config = RetryConfig::default();
        assert_eq!(config.attempts, 3);
        assert!(config.jitter);
    }
}
