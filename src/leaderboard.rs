//! Most-searched handle leaderboard on top of the store.
//!
//! Recording never fails a response and reading never fails a request:
//! store errors are logged and degraded, not propagated.

use crate::provider::Provider;
use crate::store::Store;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// One leaderboard entry with boundary-formatted timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopEntry {
    pub username: String,
    pub hit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One page of the leaderboard plus the total matching row count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopPage {
    pub entries: Vec<TopEntry>,
    pub total: u64,
}

/// Read/record surface over the store's leaderboard table.
#[derive(Clone)]
pub struct Leaderboard {
    store: Arc<Store>,
}

impl Leaderboard {
    #[must_use]
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Count one search of `handle`. Never throws, never blocks the
    /// response: a store failure is logged and dropped.
    pub fn record(&self, provider: Provider, handle: &str, avatar_url: Option<&str>) {
        let username = crate::search::normalize_handle(handle);
        if let Err(err) = self
            .store
            .leaderboard_upsert(provider, &username, avatar_url)
        {
            warn!(username = %username, error = %err, "leaderboard upsert failed");
        }
    }

    /// One page of most-searched handles, ordered
    /// `hit DESC, updated_at DESC, username ASC`.
    ///
    /// A store failure degrades to an empty page with `total = 0`; the
    /// leaderboard is not allowed to fail the request.
    #[must_use]
    pub fn top(&self, provider: Provider, limit: u32, offset: u32) -> TopPage {
        match self.store.leaderboard_page(provider, limit, offset) {
            Ok((rows, total)) => TopPage {
                entries: rows
                    .into_iter()
                    .map(|row| TopEntry {
                        username: row.username,
                        hit: row.hit,
                        avatar_url: row.avatar_url,
                        created_at: epoch_to_iso(row.created_at),
                        updated_at: epoch_to_iso(row.updated_at),
                    })
                    .collect(),
                total,
            },
            Err(err) => {
                warn!(error = %err, "leaderboard read failed, serving empty page");
                TopPage {
                    entries: Vec::new(),
                    total: 0,
                }
            }
        }
    }
}

/// UNIX seconds to ISO-8601 UTC; happens only at this boundary.
pub(crate) fn epoch_to_iso(epoch: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::{epoch_to_iso, Leaderboard};
    use crate::provider::Provider;
    use crate::store::{Store, MEMORY_PATH};
    use std::sync::Arc;

    fn leaderboard() -> Leaderboard {
        Leaderboard::new(Arc::new(Store::open(MEMORY_PATH).expect("store")))
    }

    #[test]
    fn epoch_conversion_is_utc_iso8601() {
        assert_eq!(epoch_to_iso(0), "1970-01-01T00:00:00Z");
        assert_eq!(epoch_to_iso(1_700_000_000), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn record_normalizes_handles() {
        let leaderboard = leaderboard();
        leaderboard.record(Provider::Github, "  TestUser ", None);
        leaderboard.record(Provider::Github, "testuser", None);

        let page = leaderboard.top(Provider::Github, 10, 0);
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].username, "testuser");
        assert_eq!(page.entries[0].hit, 2);
    }

    #[test]
    fn top_converts_timestamps_at_the_boundary() {
        let leaderboard = leaderboard();
        leaderboard.record(Provider::Github, "testuser", Some("https://a/1.png"));

        let page = leaderboard.top(Provider::Github, 10, 0);
        let entry = &page.entries[0];
        assert!(entry.created_at.ends_with('Z'));
        assert!(entry.updated_at.ends_with('Z'));
        assert_eq!(entry.avatar_url.as_deref(), Some("https://a/1.png"));
    }

    #[test]
    fn empty_board_is_an_empty_page() {
        let page = leaderboard().top(Provider::Github, 10, 0);
        assert!(page.entries.is_empty());
        assert_eq!(page.total, 0);
    }
}
