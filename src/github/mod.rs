//! GitHub GraphQL client: pagination, projection, and error classification.
//!
//! The client issues one combined user/organization query per page and
//! folds the paginated repository connection into a provider-agnostic
//! [`Account`] plus repository list. Upstream failures are translated into
//! the fixed [`SearchError`] taxonomy.

mod queries;
mod retry;
mod types;

use backon::Retryable;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde_json::json;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::SearchError;
use crate::models::{Account, Profile, Repository, Statistics};
use crate::provider::Provider;

use self::queries::ACCOUNT_QUERY;
use self::retry::{build_retry_builder, should_retry};
use self::types::{
    AccountData, ConnectionNode, GraphQlEnvelope, GraphQlError, OrganizationNode, UserNode,
};

pub use self::retry::RetryConfig;
pub use self::types::{Endpoint, Token};

/// Base URL reported for accounts on the public GitHub instance.
const PUBLIC_BASE_URL: &str = "https://github.com";
/// Retry hint used when a rate-limited response carries no reset header.
const DEFAULT_RETRY_AFTER: u64 = 60;
/// Maximum number of characters kept from an upstream body in error messages.
const BODY_SNIPPET_LEN: usize = 500;

const KIND_NOT_FOUND: &str = "NOT_FOUND";
const KIND_RATE_LIMITED: &str = "RATE_LIMITED";
const KIND_INSUFFICIENT_SCOPES: &str = "INSUFFICIENT_SCOPES";

/// Client for the GitHub GraphQL API.
#[derive(Debug)]
pub struct GithubClient {
    client: reqwest::Client,
    headers: HeaderMap,
    endpoint: Endpoint,
    base_url: String,
    retry: RetryConfig,
}

impl GithubClient {
    /// Create a client for the public GitHub endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] if the authorization header cannot be
    /// constructed from the token.
    pub fn new(token: impl Into<Token>) -> Result<Self, SearchError> {
        Self::with_endpoint_retry(token, Endpoint::default(), RetryConfig::default())
    }

    /// Create a client targeting a custom endpoint (GitHub Enterprise or a
    /// mock server) with custom retry settings.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] if the authorization header cannot be
    /// constructed from the token.
    pub fn with_endpoint_retry(
        token: impl Into<Token>,
        endpoint: impl Into<Endpoint>,
        retry: RetryConfig,
    ) -> Result<Self, SearchError> {
        let endpoint = endpoint.into();
        let headers = build_headers(&token.into())?;
        let base_url = base_url_from_endpoint(endpoint.as_str());
        Ok(Self {
            client: reqwest::Client::new(),
            headers,
            endpoint,
            base_url,
            retry,
        })
    }

    /// The provider this client talks to.
    #[must_use]
    pub fn provider(&self) -> Provider {
        Provider::Github
    }

    /// Base URL of the configured instance, used in cache keys.
    ///
    /// Never carries a trailing slash.
    #[must_use]
    pub fn provider_base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch an account and all of its public repositories.
    ///
    /// Pages the repository connection until exhausted. The account itself
    /// is resolved from the first page; later pages only append
    /// repositories. `cancel` is the caller's cancellation signal: firing
    /// it mid-pagination interrupts the in-flight HTTP exchange.
    ///
    /// # Errors
    ///
    /// Returns one of the [`SearchError`] variants per the classification
    /// rules; notably `UserNotFound` when neither selection resolves, and
    /// `Network` when `cancel` fires mid-fetch.
    pub async fn fetch_account(
        &self,
        handle: &str,
        cancel: &CancellationToken,
    ) -> Result<(Account, Vec<Repository>), SearchError> {
        let first = self.fetch_page(handle, None, cancel).await?;
        let (account, mut connection) = if let Some(user) = first.user {
            project_user(user)
        } else if let Some(org) = first.organization {
            project_organization(org)
        } else {
            return Err(SearchError::UserNotFound);
        };
        let is_user = matches!(account, Account::User(_));

        let mut repos: Vec<Repository> = Vec::new();
        loop {
            repos.extend(connection.nodes.into_iter().map(|node| Repository {
                name: node.name,
                language: node.primary_language.map(|lang| lang.name),
                is_fork: node.is_fork,
            }));

            let page_info = connection.page_info;
            let cursor = match page_info.end_cursor {
                Some(next) if page_info.has_next_page => next,
                _ => break,
            };

            let data = self.fetch_page(handle, Some(&cursor), cancel).await?;
            // Only the resolved side may add repositories; if it vanished
            // mid-pagination, stop with what we have.
            connection = if is_user {
                data.user.map(|user| user.repositories)
            } else {
                data.organization.map(|org| org.repositories)
            }
            .unwrap_or_default();
        }

        Ok((account, repos))
    }

    /// Fetch one page, retrying transient failures.
    ///
    /// Cancellation drops the in-flight exchange (and any backoff wait)
    /// and surfaces as `Network`.
    async fn fetch_page(
        &self,
        handle: &str,
        cursor: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<AccountData, SearchError> {
        let payload = json!({
            "query": ACCOUNT_QUERY,
            "variables": { "login": handle, "cursor": cursor },
        });
        let builder = build_retry_builder(self.retry);
        let fetch = (|| async { self.execute_once(&payload).await })
            .retry(builder)
            .sleep(sleep)
            .when(should_retry)
            .notify(|err: &SearchError, dur| {
                warn!(error = %err, delay = ?dur, "retrying GitHub query");
            });
        tokio::select! {
            () = cancel.cancelled() => {
                Err(SearchError::Network("request cancelled mid-flight".to_string()))
            }
            result = fetch => result,
        }
    }

    /// One HTTP exchange: send, read, classify.
    async fn execute_once(&self, payload: &serde_json::Value) -> Result<AccountData, SearchError> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .headers(self.headers.clone())
            .json(payload)
            .timeout(self.retry.request_timeout)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status().as_u16();
        let reset = rate_limit_reset(response.headers());
        let body = response.text().await.map_err(classify_transport)?;

        if !(200..300).contains(&status) {
            return Err(classify_http_status(status, reset, &body));
        }

        let mut de = serde_json::Deserializer::from_str(&body);
        let envelope: GraphQlEnvelope =
            serde_path_to_error::deserialize(&mut de).map_err(|err| SearchError::Provider {
                message: format!("malformed GraphQL response: {err}"),
                status: Some(status),
                details: None,
            })?;

        classify_envelope(envelope, reset)
    }
}

/// Build standard GraphQL headers with an optional authorization token.
fn build_headers(token: &Token) -> Result<HeaderMap, SearchError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("lingo"));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/vnd.github+json"),
    );
    if !token.is_empty() {
        let value = format!("Bearer {}", token.as_str())
            .parse()
            .map_err(|_| SearchError::InvalidToken)?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Trim `text` to `max` characters, appending `...` when truncated.
fn snippet(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut out = text.chars().take(max).collect::<String>();
        out.push_str("...");
        out
    }
}

fn epoch_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Seconds until the reported reset, or the default hint.
fn retry_after_from_reset(reset: Option<u64>) -> u64 {
    match reset {
        Some(reset) => reset.saturating_sub(epoch_now()),
        None => DEFAULT_RETRY_AFTER,
    }
}

fn rate_limit_reset(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("x-ratelimit-reset")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

fn classify_transport(err: reqwest::Error) -> SearchError {
    if err.is_timeout() {
        SearchError::Timeout
    } else {
        SearchError::Network(err.to_string())
    }
}

fn classify_http_status(status: u16, reset: Option<u64>, body: &str) -> SearchError {
    match status {
        401 => SearchError::InvalidToken,
        403 => SearchError::rate_limited_upstream(retry_after_from_reset(reset)),
        404 => SearchError::UserNotFound,
        _ => SearchError::Provider {
            message: format!("HTTP {status}: {}", snippet(body, BODY_SNIPPET_LEN)),
            status: Some(status),
            details: None,
        },
    }
}

/// Apply the partial-data absorption rule, then classify remaining errors.
fn classify_envelope(
    envelope: GraphQlEnvelope,
    reset: Option<u64>,
) -> Result<AccountData, SearchError> {
    let errors = envelope.errors.unwrap_or_default();
    if errors.is_empty() {
        return envelope.data.ok_or_else(|| SearchError::Provider {
            message: "GraphQL response carried neither data nor errors".to_string(),
            status: None,
            details: None,
        });
    }

    // Scope errors defeat absorption; any other error accompanied by a
    // populated side is absorbed and processing continues with that side.
    let has_scope_error = errors
        .iter()
        .any(|err| err.is_kind(KIND_INSUFFICIENT_SCOPES));
    if !has_scope_error {
        if let Some(data) = envelope.data {
            if data.has_account() {
                debug!(
                    errors = errors.len(),
                    "absorbed GraphQL errors alongside usable data"
                );
                return Ok(data);
            }
        }
    }

    Err(classify_errors(&errors, reset))
}

/// Strict-order classification of structured GraphQL errors.
fn classify_errors(errors: &[GraphQlError], reset: Option<u64>) -> SearchError {
    if errors.iter().all(|err| err.is_kind(KIND_NOT_FOUND)) {
        return SearchError::UserNotFound;
    }
    if errors.iter().any(|err| {
        err.is_kind(KIND_RATE_LIMITED) || err.message.to_ascii_lowercase().contains("rate limit")
    }) {
        return SearchError::rate_limited_upstream(retry_after_from_reset(reset));
    }
    if errors
        .iter()
        .any(|err| err.is_kind(KIND_INSUFFICIENT_SCOPES))
    {
        return SearchError::InsufficientScopes;
    }
    let lowered: Vec<String> = errors
        .iter()
        .map(|err| err.message.to_ascii_lowercase())
        .collect();
    if lowered.iter().any(|msg| msg.contains("bad credentials")) {
        return SearchError::InvalidToken;
    }
    if lowered.iter().any(|msg| {
        msg.contains("network") || msg.contains("timeout") || msg.contains("econnrefused")
    }) {
        return SearchError::Network(join_messages(errors));
    }
    SearchError::Provider {
        message: join_messages(errors),
        status: None,
        details: serde_json::to_value(errors).ok(),
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|err| err.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keep a display name only when it survives trimming.
fn clean_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

fn project_user(node: UserNode) -> (Account, ConnectionNode) {
    let is_verified = node
        .email
        .as_deref()
        .is_some_and(|email| !email.trim().is_empty());
    let statistics = Statistics {
        followers: node.followers.map(|count| count.total_count),
        following: node.following.map(|count| count.total_count),
        members: None,
    };
    let profile = Profile {
        provider_user_id: node.id,
        name: clean_name(node.name),
        provider_base_url: base_url_from_avatar(node.avatar_url.as_deref()),
        avatar_url: node.avatar_url,
        created_at: node.created_at,
        is_verified,
        statistics: (!statistics.is_empty()).then_some(statistics),
    };
    (Account::User(profile), node.repositories)
}

fn project_organization(node: OrganizationNode) -> (Account, ConnectionNode) {
    let statistics = Statistics {
        followers: None,
        following: None,
        members: node.members_with_role.map(|count| count.total_count),
    };
    let profile = Profile {
        provider_user_id: node.id,
        name: clean_name(node.name),
        provider_base_url: base_url_from_avatar(node.avatar_url.as_deref()),
        avatar_url: node.avatar_url,
        created_at: node.created_at,
        is_verified: node.is_verified.unwrap_or(false),
        statistics: (!statistics.is_empty()).then_some(statistics),
    };
    (Account::Organization(profile), node.repositories)
}

/// Derive the instance base URL from an avatar URL.
///
/// GitHub-family instances serve avatars from an `avatars.`-prefixed
/// subdomain of the web host; stripping the prefix recovers the instance.
/// `avatars.githubusercontent.com` is the public instance's CDN and maps to
/// `https://github.com`, as does every unrecognized shape.
fn base_url_from_avatar(avatar_url: Option<&str>) -> String {
    let Some(avatar_url) = avatar_url else {
        return PUBLIC_BASE_URL.to_string();
    };
    let Ok(url) = Url::parse(avatar_url) else {
        return PUBLIC_BASE_URL.to_string();
    };
    let Some(host) = url.host_str() else {
        return PUBLIC_BASE_URL.to_string();
    };
    if host == "avatars.githubusercontent.com" {
        return PUBLIC_BASE_URL.to_string();
    }
    let Some(stripped) = host.strip_prefix("avatars.") else {
        return PUBLIC_BASE_URL.to_string();
    };
    if stripped.is_empty() {
        return PUBLIC_BASE_URL.to_string();
    }
    match url.port() {
        Some(port) => format!("{}://{stripped}:{port}", url.scheme()),
        None => format!("{}://{stripped}", url.scheme()),
    }
}

/// Derive the instance base URL from the configured GraphQL endpoint.
///
/// Used for cache keys, where the base URL must be known before any
/// account has been fetched.
fn base_url_from_endpoint(endpoint: &str) -> String {
    let Ok(url) = Url::parse(endpoint) else {
        return PUBLIC_BASE_URL.to_string();
    };
    let Some(host) = url.host_str() else {
        return PUBLIC_BASE_URL.to_string();
    };
    if host == "api.github.com" {
        return PUBLIC_BASE_URL.to_string();
    }
    match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    }
}

#[cfg(test)]
mod tests;
