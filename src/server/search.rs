//! The `/api/v1/search` handler.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use tokio_util::sync::CancellationToken;

use super::{error_response, AppState, Metadata};
use crate::error::SearchError;
use crate::leaderboard::epoch_to_iso;
use crate::models::{Account, LanguageBucket, SearchHit};
use crate::provider::Provider;
use crate::search::SearchOptions;

/// Valid handle: 1-39 ASCII letters, digits, or hyphens.
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{1,39}$").expect("valid regex"));

#[derive(Debug, Deserialize)]
pub(super) struct SearchParams {
    provider: Option<String>,
    username: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SuccessEnvelope {
    ok: bool,
    provider: Provider,
    profile: Account,
    data: Vec<LanguageBucket>,
    metadata: Metadata,
}

pub(super) async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let provider = match params.provider.as_deref() {
        None => Provider::default(),
        Some(raw) => match Provider::parse(raw) {
            Some(provider) => provider,
            None => {
                return error_response(
                    None,
                    &SearchError::Validation(format!("unknown provider '{raw}'")),
                );
            }
        },
    };
    if !provider.is_implemented() {
        return error_response(Some(provider), &SearchError::NotImplemented(provider));
    }

    let username = params.username.as_deref().map(str::trim).unwrap_or_default();
    if !HANDLE_RE.is_match(username) {
        return error_response(
            Some(provider),
            &SearchError::Validation(
                "username must be 1-39 ASCII letters, digits, or hyphens".to_string(),
            ),
        );
    }

    // Tie the search's cancellation signal to this request: when the
    // client disconnects, axum drops this future and the guard fires.
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    match state
        .search
        .search(username, &SearchOptions::default(), cancel)
        .await
    {
        Ok(hit) => success_response(provider, hit),
        Err(err) => error_response(Some(provider), &err),
    }
}

fn success_response(provider: Provider, hit: SearchHit) -> Response {
    let metadata = Metadata {
        generated_at: epoch_to_iso(hit.generated_at),
        unit: Some("repos"),
        cached_at: hit.cached_at.map(epoch_to_iso),
        cached_until: hit.cached_until.map(epoch_to_iso),
    };
    let body = SuccessEnvelope {
        ok: true,
        provider,
        profile: hit.payload.profile,
        data: hit.payload.data,
        metadata,
    };
    (StatusCode::OK, Json(body)).into_response()
}
