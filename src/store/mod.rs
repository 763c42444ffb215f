//! Embedded SQLite storage for the search cache and the leaderboard.
//!
//! One connection guarded by a mutex serializes writes; every operation is
//! synchronous and short, and timestamps are computed by SQLite itself so
//! the store is the single source of truth for its own clocks.

use crate::provider::Provider;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Sentinel database path selecting an in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache (
    provider          TEXT NOT NULL,
    provider_base_url TEXT NOT NULL,
    username          TEXT NOT NULL,
    schema_version    TEXT NOT NULL,
    options_hash      TEXT NOT NULL,
    payload_json      TEXT NOT NULL,
    cached_at         INTEGER NOT NULL,
    cached_until      INTEGER NOT NULL,
    updated_at        INTEGER NOT NULL,
    PRIMARY KEY (provider, provider_base_url, username, schema_version, options_hash)
);
CREATE TABLE IF NOT EXISTS topsearch (
    provider   TEXT NOT NULL,
    username   TEXT NOT NULL,
    hit        INTEGER NOT NULL,
    avatar_url TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (provider, username)
);
CREATE INDEX IF NOT EXISTS idx_topsearch_provider_hit
    ON topsearch (provider, hit DESC);
CREATE INDEX IF NOT EXISTS idx_topsearch_provider_updated
    ON topsearch (provider, updated_at DESC);
";

/// Errors raised by store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Composite key addressing one cache row.
///
/// `username` and `provider_base_url` are normalized on every lookup and
/// write, so differently-cased handles and trailing-slash base URLs address
/// the same row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    pub provider: Provider,
    pub provider_base_url: String,
    pub username: String,
    pub schema_version: &'static str,
    pub options_hash: String,
}

impl CacheKey {
    fn normalized_username(&self) -> String {
        self.username.trim().to_ascii_lowercase()
    }

    fn normalized_base_url(&self) -> &str {
        self.provider_base_url.trim_end_matches('/')
    }

    /// Flat string form used as the single-flight map key.
    #[must_use]
    pub fn flat(&self) -> String {
        format!(
            "{}\u{1f}{}\u{1f}{}\u{1f}{}\u{1f}{}",
            self.provider,
            self.normalized_base_url(),
            self.normalized_username(),
            self.schema_version,
            self.options_hash
        )
    }
}

/// One cache row as stored, timing metadata included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRow {
    pub payload_json: String,
    pub cached_at: i64,
    pub cached_until: i64,
    pub updated_at: i64,
}

/// One leaderboard row as stored, timestamps in UNIX seconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardRow {
    pub username: String,
    pub hit: u64,
    pub avatar_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Handle to the embedded database.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (and create if needed) the database at `path`.
    ///
    /// The [`MEMORY_PATH`] sentinel opens a private in-memory database.
    /// Schema creation is idempotent.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the file cannot be opened or the
    /// schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = if path.as_os_str() == MEMORY_PATH {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means a panic elsewhere mid-operation; the
        // connection itself stays usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a cache row, fresh or not. The caller checks `cached_until`.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on query failure; callers on the serving
    /// path treat that the same as a miss.
    pub fn cache_get(&self, key: &CacheKey) -> Result<Option<CacheRow>, StoreError> {
        let conn = self.conn();
        let row = conn
            .query_row(
                "SELECT payload_json, cached_at, cached_until, updated_at
                 FROM cache
                 WHERE provider = ?1 AND provider_base_url = ?2 AND username = ?3
                   AND schema_version = ?4 AND options_hash = ?5",
                params![
                    key.provider.as_str(),
                    key.normalized_base_url(),
                    key.normalized_username(),
                    key.schema_version,
                    key.options_hash,
                ],
                |row| {
                    Ok(CacheRow {
                        payload_json: row.get(0)?,
                        cached_at: row.get(1)?,
                        cached_until: row.get(2)?,
                        updated_at: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Insert or overwrite a cache row and return it as stored.
    ///
    /// Timestamps come from SQLite's clock; `cached_until` is
    /// `cached_at + ttl_seconds`. Returning the stored row spares callers a
    /// second read.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on write failure; the search path logs and
    /// swallows it.
    pub fn cache_upsert(
        &self,
        key: &CacheKey,
        payload_json: &str,
        ttl_seconds: i64,
    ) -> Result<CacheRow, StoreError> {
        let conn = self.conn();
        let row = conn.query_row(
            "INSERT INTO cache (provider, provider_base_url, username, schema_version,
                                options_hash, payload_json, cached_at, cached_until, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                     CAST(strftime('%s','now') AS INTEGER),
                     CAST(strftime('%s','now') AS INTEGER) + ?7,
                     CAST(strftime('%s','now') AS INTEGER))
             ON CONFLICT (provider, provider_base_url, username, schema_version, options_hash)
             DO UPDATE SET
                 payload_json = excluded.payload_json,
                 cached_at    = excluded.cached_at,
                 cached_until = excluded.cached_until,
                 updated_at   = excluded.updated_at
             RETURNING payload_json, cached_at, cached_until, updated_at",
            params![
                key.provider.as_str(),
                key.normalized_base_url(),
                key.normalized_username(),
                key.schema_version,
                key.options_hash,
                payload_json,
                ttl_seconds,
            ],
            |row| {
                Ok(CacheRow {
                    payload_json: row.get(0)?,
                    cached_at: row.get(1)?,
                    cached_until: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )?;
        Ok(row)
    }

    /// Record one search of `username`, creating the row at `hit = 1`.
    ///
    /// A single atomic statement; the avatar is only overwritten by
    /// non-empty values.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on write failure; the leaderboard logs and
    /// swallows it.
    pub fn leaderboard_upsert(
        &self,
        provider: Provider,
        username: &str,
        avatar_url: Option<&str>,
    ) -> Result<(), StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO topsearch (provider, username, hit, avatar_url, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3,
                     CAST(strftime('%s','now') AS INTEGER),
                     CAST(strftime('%s','now') AS INTEGER))
             ON CONFLICT (provider, username) DO UPDATE SET
                 hit        = topsearch.hit + 1,
                 updated_at = excluded.updated_at,
                 avatar_url = CASE
                     WHEN excluded.avatar_url IS NOT NULL AND excluded.avatar_url <> ''
                     THEN excluded.avatar_url
                     ELSE topsearch.avatar_url
                 END",
            params![provider.as_str(), username, avatar_url],
        )?;
        Ok(())
    }

    /// One page of the leaderboard plus the total row count for the
    /// provider.
    ///
    /// Ordering is `hit DESC, updated_at DESC, username ASC`; the handle
    /// tiebreaker keeps pagination deterministic.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] on query failure; the leaderboard degrades
    /// to an empty page.
    pub fn leaderboard_page(
        &self,
        provider: Provider,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<LeaderboardRow>, u64), StoreError> {
        let conn = self.conn();
        let total: u64 = conn.query_row(
            "SELECT COUNT(*) FROM topsearch WHERE provider = ?1",
            params![provider.as_str()],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT username, hit, avatar_url, created_at, updated_at
             FROM topsearch
             WHERE provider = ?1
             ORDER BY hit DESC, updated_at DESC, username ASC
             LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
            .query_map(params![provider.as_str(), limit, offset], |row| {
                Ok(LeaderboardRow {
                    username: row.get(0)?,
                    hit: row.get(1)?,
                    avatar_url: row.get(2)?,
                    created_at: row.get(3)?,
                    updated_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok((rows, total))
    }
}
