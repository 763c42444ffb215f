//! The `/api/v1/topsearch` handler.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{error_response, AppState};
use crate::error::SearchError;
use crate::leaderboard::TopEntry;
use crate::provider::Provider;

const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 100;

/// Raw query parameters; numbers are validated by hand so a bad value
/// produces the service's own error envelope, not the extractor's.
#[derive(Debug, Deserialize)]
pub(super) struct TopParams {
    provider: Option<String>,
    limit: Option<String>,
    offset: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    total: u64,
    count: usize,
    offset: u32,
    limit: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopEnvelope {
    ok: bool,
    provider: Provider,
    data: Vec<TopEntry>,
    pagination: Pagination,
}

pub(super) async fn topsearch(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopParams>,
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

    let limit = match parse_number(params.limit.as_deref(), DEFAULT_LIMIT, "limit", provider) {
        Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
        Ok(_) => {
            return error_response(
                Some(provider),
                &SearchError::Validation(format!("limit must be between 1 and {MAX_LIMIT}")),
            );
        }
        Err(response) => return response,
    };
    let offset = match parse_number(params.offset.as_deref(), 0, "offset", provider) {
        Ok(offset) => offset,
        Err(response) => return response,
    };

    let page = state.leaderboard.top(provider, limit, offset);
    let body = TopEnvelope {
        ok: true,
        provider,
        pagination: Pagination {
            total: page.total,
            count: page.entries.len(),
            offset,
            limit,
        },
        data: page.entries,
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Parse an optional numeric parameter, rejecting negatives and garbage.
///
/// The failure envelope reports the already-resolved provider, matching
/// the search handler's behavior.
fn parse_number(
    raw: Option<&str>,
    default: u32,
    field: &str,
    provider: Provider,
) -> Result<u32, Response> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            error_response(
                Some(provider),
                &SearchError::Validation(format!("{field} must be a non-negative integer")),
            )
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_number;
    use crate::provider::Provider;

    #[test]
    fn absent_values_take_the_default() {
        assert_eq!(
            parse_number(None, 10, "limit", Provider::Github).expect("default"),
            10
        );
    }

    #[test]
    fn numeric_strings_parse() {
        assert_eq!(
            parse_number(Some("25"), 10, "limit", Provider::Github).expect("parse"),
            25
        );
        assert_eq!(
            parse_number(Some(" 0 "), 10, "offset", Provider::Github).expect("parse"),
            0
        );
    }

    #[test]
    fn negatives_and_garbage_are_rejected() {
        assert!(parse_number(Some("-1"), 10, "offset", Provider::Github).is_err());
        assert!(parse_number(Some("ten"), 10, "limit", Provider::Github).is_err());
        assert!(parse_number(Some(""), 10, "limit", Provider::Github).is_err());
    }
}
