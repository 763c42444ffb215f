//! The error taxonomy shared by the search core and the HTTP facade.

use crate::provider::Provider;
use thiserror::Error;

/// Message used when the internal concurrency cap rejects a search.
///
/// Deliberately distinct from [`UPSTREAM_RATE_LIMIT_MESSAGE`]: both surface
/// as `rate_limited`, and the message is the only way callers can tell the
/// two apart.
pub const INTERNAL_RATE_LIMIT_MESSAGE: &str = "too many concurrent searches, try again shortly";

/// Message used when the upstream provider reports rate limiting.
pub const UPSTREAM_RATE_LIMIT_MESSAGE: &str = "GitHub API rate limit exceeded";

/// Errors surfaced by a search, each with a stable wire code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("{0}")]
    Validation(String),
    #[error("user or organization not found")]
    UserNotFound,
    #[error("{message}")]
    RateLimited {
        message: String,
        /// Seconds until the upstream window resets. Absent for the
        /// internal concurrency cap.
        retry_after: Option<u64>,
    },
    #[error("invalid or expired GitHub token")]
    InvalidToken,
    #[error("token is missing required scopes")]
    InsufficientScopes,
    #[error("network error reaching GitHub: {0}")]
    Network(String),
    #[error("request to GitHub timed out")]
    Timeout,
    #[error("provider '{0}' is not implemented")]
    NotImplemented(Provider),
    #[error("GitHub API error: {message}")]
    Provider {
        message: String,
        status: Option<u16>,
        /// Structured upstream error list, when the response carried one.
        details: Option<serde_json::Value>,
    },
    #[error("unexpected error: {0}")]
    Unknown(String),
}

impl SearchError {
    /// Rejection produced when the concurrency semaphore is saturated.
    #[must_use]
    pub fn rate_limited_internal() -> Self {
        Self::RateLimited {
            message: INTERNAL_RATE_LIMIT_MESSAGE.to_string(),
            retry_after: None,
        }
    }

    /// Upstream rate limit with the seconds-until-reset hint.
    #[must_use]
    pub fn rate_limited_upstream(retry_after: u64) -> Self {
        Self::RateLimited {
            message: UPSTREAM_RATE_LIMIT_MESSAGE.to_string(),
            retry_after: Some(retry_after),
        }
    }

    /// The stable machine-readable code carried on the wire.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::UserNotFound => "user_not_found",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidToken => "invalid_token",
            Self::InsufficientScopes => "insufficient_scopes",
            Self::Network(_) => "network_error",
            Self::Timeout => "timeout",
            Self::NotImplemented(_) => "not_implemented",
            Self::Provider { .. } => "provider_error",
            Self::Unknown(_) => "unknown_error",
        }
    }

    /// Seconds-until-retry hint, when one applies.
    #[must_use]
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Structured detail payload, when the upstream supplied one.
    #[must_use]
    pub fn details(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Provider { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}
