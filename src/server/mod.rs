//! HTTP facade: router, response envelopes, and status mapping.

mod search;
mod topsearch;

use anyhow::Context;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowMethods, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::SearchError;
use crate::github::{Endpoint, GithubClient, RetryConfig};
use crate::leaderboard::{epoch_to_iso, Leaderboard};
use crate::provider::Provider;
use crate::search::SearchCore;
use crate::store::Store;

/// Shared state behind every handler.
pub struct AppState {
    pub search: SearchCore,
    pub leaderboard: Leaderboard,
}

/// Construct the application state from configuration.
///
/// # Errors
///
/// Fails when the database cannot be opened or the upstream client cannot
/// be constructed.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store = Arc::new(Store::open(&config.db_path).context("opening database")?);
    let endpoint = config
        .github_api_url
        .clone()
        .map_or_else(Endpoint::default, Endpoint::new);
    let client = GithubClient::with_endpoint_retry(
        config.github_token.clone().unwrap_or_default(),
        endpoint,
        RetryConfig::default(),
    )
    .context("building GitHub client")?;
    let search = SearchCore::new(
        client,
        Arc::clone(&store),
        config.enable_cache,
        config.ttl_seconds(),
        config.concurrency_limit,
    );
    Ok(AppState {
        search,
        leaderboard: Leaderboard::new(store),
    })
}

/// Build the service router.
///
/// # Errors
///
/// Fails when a configured CORS origin does not parse.
pub fn build_router(state: AppState, allowed_origins: &[String]) -> anyhow::Result<Router> {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any)
    } else {
        let origins = allowed_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect::<Result<Vec<_>, _>>()
            .context("failed to parse allowed origins")?;
        CorsLayer::new()
            .allow_methods(AllowMethods::mirror_request())
            .allow_origin(AllowOrigin::list(origins))
    };

    Ok(Router::new()
        .route("/healthz", get(healthz))
        .route("/api/v1/search", get(search::search))
        .route("/api/v1/topsearch", get(topsearch::topsearch))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state)))
}

/// Bind and serve until the process is told to stop.
///
/// # Errors
///
/// Fails when startup (state, router, listener) or the server loop fails.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = build_state(&config)?;
    let router = build_router(state, &config.allowed_origins)?;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .context("binding to port")?;
    tracing::info!(port = config.port, "lingo listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
    }
}

async fn healthz() -> &'static str {
    "ok"
}

/// Timing metadata attached to every response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata {
    generated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cached_until: Option<String>,
}

impl Metadata {
    /// Metadata for an error response: `generatedAt` only.
    fn bare() -> Self {
        Self {
            generated_at: epoch_to_iso(chrono::Utc::now().timestamp()),
            unit: None,
            cached_at: None,
            cached_until: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_seconds: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureEnvelope {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<Provider>,
    error: ErrorBody,
    metadata: Metadata,
}

/// Render a [`SearchError`] as the wire envelope with its mapped status.
fn error_response(provider: Option<Provider>, err: &SearchError) -> Response {
    let body = FailureEnvelope {
        ok: false,
        provider,
        error: ErrorBody {
            code: err.code(),
            message: err.to_string(),
            details: err.details().cloned(),
            retry_after_seconds: err.retry_after_seconds(),
        },
        metadata: Metadata::bare(),
    };
    (http_status(err), Json(body)).into_response()
}

/// Error code to HTTP status, per the service contract.
fn http_status(err: &SearchError) -> StatusCode {
    match err {
        SearchError::Validation(_) => StatusCode::BAD_REQUEST,
        SearchError::InvalidToken => StatusCode::UNAUTHORIZED,
        SearchError::UserNotFound => StatusCode::NOT_FOUND,
        SearchError::RateLimited { .. } | SearchError::InsufficientScopes => StatusCode::FORBIDDEN,
        SearchError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
        SearchError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
        SearchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SearchError::Provider { .. } | SearchError::Unknown(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
