//! The search core: read-through cache, single-flight coalescing,
//! stale-on-error fallback, and the upstream concurrency cap.
//!
//! Every language-statistics read goes through [`SearchCore::search`]. The
//! cache is consulted first; on a miss or an expired row, concurrent callers
//! for the same key coalesce onto one spawned upstream fetch, and an
//! expired-but-decodable row is served as a fallback when that fetch fails.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::aggregate::aggregate;
use crate::error::SearchError;
use crate::github::GithubClient;
use crate::leaderboard::Leaderboard;
use crate::models::{SearchHit, SearchPayload};
use crate::store::{CacheKey, CacheRow, Store};

/// Version tag baked into every cache key.
///
/// Bump this when the payload shape changes; old rows become unreachable
/// without explicit deletion.
pub const SCHEMA_VERSION: &str = "v1";

/// Hash value of an empty option set.
const DEFAULT_OPTIONS_HASH: &str = "default";

/// Future search options, hashed deterministically into the cache key.
///
/// No options exist today; the type fixes the key derivation so adding one
/// later cannot silently alias existing cache rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOptions(BTreeMap<String, String>);

impl SearchOptions {
    /// Deterministic hash: sorted `k=v` pairs joined with `&`, or the
    /// literal `"default"` when empty.
    #[must_use]
    pub fn hash(&self) -> String {
        if self.0.is_empty() {
            return DEFAULT_OPTIONS_HASH.to_string();
        }
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    #[cfg(test)]
    fn set(&mut self, key: &str, value: &str) {
        self.0.insert(key.to_string(), value.to_string());
    }
}

/// Lowercase, trimmed form of a handle used everywhere downstream.
#[must_use]
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().to_ascii_lowercase()
}

type FetchResult = Result<SearchHit, SearchError>;
type SharedFetch = Shared<BoxFuture<'static, Arc<FetchResult>>>;

struct CoreInner {
    client: GithubClient,
    store: Arc<Store>,
    leaderboard: Leaderboard,
    enable_cache: bool,
    ttl_seconds: i64,
    semaphore: Arc<Semaphore>,
    in_flight: Mutex<HashMap<String, SharedFetch>>,
}

/// Orchestrates cache, upstream client, aggregator, and leaderboard.
#[derive(Clone)]
pub struct SearchCore {
    inner: Arc<CoreInner>,
}

impl SearchCore {
    #[must_use]
    pub fn new(
        client: GithubClient,
        store: Arc<Store>,
        enable_cache: bool,
        ttl_seconds: i64,
        concurrency_limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(CoreInner {
                leaderboard: Leaderboard::new(Arc::clone(&store)),
                client,
                store,
                enable_cache,
                ttl_seconds,
                semaphore: Arc::new(Semaphore::new(concurrency_limit)),
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Look up the language statistics for `handle`.
    ///
    /// `cancel` is this caller's cancellation signal. Cancelling a caller
    /// that is merely awaiting another caller's fetch detaches it alone;
    /// cancelling the caller that initiated the fetch aborts the upstream
    /// call, clears the single-flight entry, and wakes every waiter with a
    /// `Network` error.
    ///
    /// # Errors
    ///
    /// Returns a [`SearchError`] when the upstream fetch fails (or is
    /// cancelled) and no stale cache row is available, or when the
    /// concurrency cap rejects the request outright.
    pub async fn search(
        &self,
        handle: &str,
        options: &SearchOptions,
        cancel: CancellationToken,
    ) -> Result<SearchHit, SearchError> {
        let username = normalize_handle(handle);
        let key = self.cache_key(&username, options);

        let cached = if self.inner.enable_cache {
            self.read_cache(&key)
        } else {
            None
        };

        let now = epoch_now();
        if let Some((payload, row)) = &cached {
            if now < row.cached_until {
                return Ok(SearchHit {
                    payload: payload.clone(),
                    generated_at: row.cached_at,
                    cached_at: Some(row.cached_at),
                    cached_until: Some(row.cached_until),
                });
            }
        }

        let outcome = self.fetch_coalesced(key, username.clone(), &cancel).await;
        match outcome.as_ref() {
            Ok(hit) => Ok(hit.clone()),
            Err(err) => {
                if let Some((payload, row)) = cached {
                    warn!(
                        username = %username,
                        error = %err,
                        "serving stale cache after upstream failure"
                    );
                    return Ok(SearchHit {
                        payload,
                        generated_at: row.cached_at,
                        cached_at: Some(row.cached_at),
                        cached_until: Some(row.cached_until),
                    });
                }
                Err(err.clone())
            }
        }
    }

    /// Cache key for a handle under the configured provider and instance.
    fn cache_key(&self, username: &str, options: &SearchOptions) -> CacheKey {
        CacheKey {
            provider: self.inner.client.provider(),
            provider_base_url: self.inner.client.provider_base_url().to_string(),
            username: username.to_string(),
            schema_version: SCHEMA_VERSION,
            options_hash: options.hash(),
        }
    }

    /// Read and decode a cache row; any failure counts as a miss.
    fn read_cache(&self, key: &CacheKey) -> Option<(SearchPayload, CacheRow)> {
        let row = match self.inner.store.cache_get(key) {
            Ok(row) => row?,
            Err(err) => {
                warn!(error = %err, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str::<SearchPayload>(&row.payload_json) {
            Ok(payload) => Some((payload, row)),
            Err(err) => {
                warn!(error = %err, "cache payload failed to decode, treating as miss");
                None
            }
        }
    }

    /// Coalesce concurrent fetches of the same key onto one spawned task.
    ///
    /// The initiator must win a semaphore permit; waiters on an existing
    /// in-flight fetch join for free. The spawned task carries the
    /// initiator's cancellation token, so cancelling the fetcher aborts
    /// the upstream call and resolves the shared future with a `Network`
    /// error for every waiter. A waiter's own token only detaches that
    /// waiter. The map entry is cleared once the fetch settles.
    async fn fetch_coalesced(
        &self,
        key: CacheKey,
        username: String,
        cancel: &CancellationToken,
    ) -> Arc<FetchResult> {
        let map_key = key.flat();
        let shared = {
            let mut in_flight = lock_in_flight(&self.inner.in_flight);
            if let Some(existing) = in_flight.get(&map_key) {
                debug!(username = %username, "joining in-flight fetch");
                existing.clone()
            } else {
                let permit = match Arc::clone(&self.inner.semaphore).try_acquire_owned() {
                    Ok(permit) => permit,
                    Err(_) => return Arc::new(Err(SearchError::rate_limited_internal())),
                };
                let core = self.clone();
                let fetcher_cancel = cancel.clone();
                let task_key = map_key.clone();
                let task = tokio::spawn(async move {
                    let result = core.run_fetch(key, username, permit, fetcher_cancel).await;
                    lock_in_flight(&core.inner.in_flight).remove(&task_key);
                    result
                });

                let inner = Arc::clone(&self.inner);
                let cleanup_key = map_key.clone();
                let shared: SharedFetch = async move {
                    let result = match task.await {
                        Ok(result) => result,
                        Err(join_err) => {
                            // The task never reached its own cleanup.
                            lock_in_flight(&inner.in_flight).remove(&cleanup_key);
                            Err(SearchError::Unknown(format!("search task failed: {join_err}")))
                        }
                    };
                    Arc::new(result)
                }
                .boxed()
                .shared();

                in_flight.insert(map_key, shared.clone());
                shared
            }
        };

        // A cancelled waiter detaches alone; the fetch keeps running for
        // the remaining waiters and still populates the cache.
        tokio::select! {
            () = cancel.cancelled() => Arc::new(Err(SearchError::Network(
                "search cancelled by the caller".to_string(),
            ))),
            outcome = shared => outcome,
        }
    }

    /// The single upstream fetch behind the shared future.
    ///
    /// Runs as a spawned task governed by the initiator's cancellation
    /// token, so no waiter can abort it. Holds the semaphore permit for
    /// its whole lifetime; the permit drops on every exit path, panics and
    /// cancellation included.
    async fn run_fetch(
        &self,
        key: CacheKey,
        username: String,
        permit: OwnedSemaphorePermit,
        cancel: CancellationToken,
    ) -> FetchResult {
        let _permit = permit;
        let (account, repos) = self.inner.client.fetch_account(&username, &cancel).await?;
        let buckets = aggregate(&repos);
        let avatar_url = account.avatar_url().map(ToString::to_string);
        let payload = SearchPayload {
            profile: account,
            data: buckets,
        };

        let mut hit = SearchHit {
            generated_at: epoch_now(),
            cached_at: None,
            cached_until: None,
            payload,
        };

        if self.inner.enable_cache {
            match serde_json::to_string(&hit.payload) {
                Ok(blob) => match self.inner.store.cache_upsert(&key, &blob, self.inner.ttl_seconds)
                {
                    Ok(row) => {
                        hit.cached_at = Some(row.cached_at);
                        hit.cached_until = Some(row.cached_until);
                    }
                    Err(err) => warn!(username = %username, error = %err, "cache write failed"),
                },
                Err(err) => warn!(username = %username, error = %err, "payload encode failed"),
            }
        }

        self.inner.leaderboard.record(
            self.inner.client.provider(),
            &username,
            avatar_url.as_deref(),
        );

        Ok(hit)
    }

    /// Permits currently available on the upstream semaphore.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.semaphore.available_permits()
    }
}

fn lock_in_flight(
    map: &Mutex<HashMap<String, SharedFetch>>,
) -> std::sync::MutexGuard<'_, HashMap<String, SharedFetch>> {
    map.lock().unwrap_or_else(PoisonError::into_inner)
}

fn epoch_now() -> i64 {
    chrono::Utc::now().timestamp()
}
