//! Site-scoped query cache with deduplicated, cancellable fetches
//!
//! Each fetch runs as a spawned task holding a [`CancellationToken`] derived
//! from the cache epoch. Invalidation cancels the token of every matching
//! in-flight fetch, and [`InvalidationScope::All`] replaces the epoch, so a
//! fetch that completes after its key was invalidated never writes back.
//!
//! Concurrent lookups for one key share a single [`PendingFetch`], so at most
//! one gateway call is outstanding per key and every waiter receives the same
//! `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::config::CacheConfig;
use super::key::{CacheKey, InvalidationScope};
use super::stats::CacheStats;
use crate::error::{Error, Result};
use crate::guard::SiteOwned;

/// Shared handle on a fetch in flight
pub type PendingFetch<V> = Shared<BoxFuture<'static, Result<Arc<V>>>>;

/// How a lookup was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cached and younger than the staleness window
    Fresh,
    /// Cached but older than the staleness window; a refresh is running
    Stale,
    /// Fetched from the gateway for this lookup
    Fetched,
}

/// Result of a cache lookup
#[derive(Debug, Clone)]
pub struct Lookup<V> {
    pub value: Arc<V>,
    pub freshness: Freshness,
    /// A fetch for this key is in flight
    pub refreshing: bool,
    /// Error from the last failed refresh of this entry
    pub last_error: Option<Error>,
}

impl<V> Lookup<V> {
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }
}

struct Entry<V> {
    value: Arc<V>,
    fetched_at: Instant,
    last_error: Option<Error>,
}

struct InFlight<V> {
    ticket: u64,
    token: CancellationToken,
    future: PendingFetch<V>,
    waiters: Waiters,
}

/// Liveness of everyone awaiting one fetch
#[derive(Default)]
struct Waiters {
    /// Some waiter has no liveness token and never goes away
    unbounded: bool,
    tokens: Vec<CancellationToken>,
}

impl Waiters {
    fn add(&mut self, liveness: Option<CancellationToken>) {
        match liveness {
            Some(token) => self.tokens.push(token),
            None => self.unbounded = true,
        }
    }

    fn all_gone(&self) -> bool {
        !self.unbounded && self.tokens.iter().all(CancellationToken::is_cancelled)
    }
}

#[derive(Default)]
struct Counters {
    hits: u64,
    stale_hits: u64,
    misses: u64,
    fetches: u64,
    dedup_joins: u64,
    fetch_errors: u64,
    discarded: u64,
    invalidations: u64,
    evictions: u64,
}

struct CacheState<V> {
    entries: HashMap<CacheKey, Entry<V>>,
    in_flight: HashMap<CacheKey, InFlight<V>>,
    epoch: CancellationToken,
    next_ticket: u64,
    counters: Counters,
}

impl<V> CacheState<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashMap::new(),
            epoch: CancellationToken::new(),
            next_ticket: 0,
            counters: Counters::default(),
        }
    }

    fn store(&mut self, config: CacheConfig, key: CacheKey, value: Arc<V>) {
        if !self.entries.contains_key(&key)
            && self.entries.len() >= config.max_entries
            && let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest);
            self.counters.evictions += 1;
            tracing::debug!(cache.key = %oldest, "Evicted oldest cache entry");
        }

        self.entries.insert(
            key,
            Entry {
                value,
                fetched_at: Instant::now(),
                last_error: None,
            },
        );
    }
}

/// Thread-safe cache of values of one kind, keyed by [`CacheKey`]
pub struct QueryCache<V> {
    name: &'static str,
    config: CacheConfig,
    state: Arc<Mutex<CacheState<V>>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            config: self.config,
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> fmt::Debug for QueryCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("QueryCache")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("entry_count", &state.entries.len())
            .field("in_flight", &state.in_flight.len())
            .finish_non_exhaustive()
    }
}

impl<V: SiteOwned> QueryCache<V> {
    #[must_use]
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        Self {
            name,
            config,
            state: Arc::new(Mutex::new(CacheState::new())),
        }
    }

    #[must_use]
    pub const fn config(&self) -> CacheConfig {
        self.config
    }

    /// Look up `key`, fetching on a miss and refreshing in the background when stale.
    ///
    /// `fetch` is only invoked when a new gateway call is needed. A caller
    /// whose `liveness` is cancelled gets [`Error::Cancelled`]; the fetched
    /// value is still stored unless every waiter on the fetch has gone away.
    pub async fn get<F, Fut>(
        &self,
        key: &CacheKey,
        liveness: Option<&CancellationToken>,
        fetch: F,
    ) -> Result<Lookup<V>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let span = tracing::debug_span!(
            "cache.get",
            cache.name = self.name,
            cache.key = %key,
            cache.namespace = key.namespace().as_str(),
        );
        let liveness = liveness.cloned();

        async move {
            let pending = {
                let mut state = self.state.lock();
                if let Some(mut lookup) = self.lookup_entry(&mut state, key) {
                    if lookup.is_stale() && !lookup.refreshing {
                        let _refresh = self.start_fetch(&mut state, key, None, fetch());
                        lookup.refreshing = true;
                    }
                    return Ok(lookup);
                }
                state.counters.misses += 1;
                tracing::debug!(cache.result = "miss");
                self.join_or_start(&mut state, key, liveness.clone(), fetch)
            };

            let value = pending.await?;
            if liveness.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Cancelled);
            }
            Ok(Lookup {
                value,
                freshness: Freshness::Fetched,
                refreshing: false,
                last_error: None,
            })
        }
        .instrument(span)
        .await
    }

    /// Fetch `key` regardless of freshness, joining a fetch already in flight
    pub async fn refetch<F, Fut>(
        &self,
        key: &CacheKey,
        liveness: Option<&CancellationToken>,
        fetch: F,
    ) -> Result<Lookup<V>>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let span = tracing::debug_span!("cache.refetch", cache.name = self.name, cache.key = %key);
        let liveness = liveness.cloned();

        async move {
            let pending = {
                let mut state = self.state.lock();
                self.join_or_start(&mut state, key, liveness.clone(), fetch)
            };
            let value = pending.await?;
            if liveness.as_ref().is_some_and(CancellationToken::is_cancelled) {
                return Err(Error::Cancelled);
            }
            Ok(Lookup {
                value,
                freshness: Freshness::Fetched,
                refreshing: false,
                last_error: None,
            })
        }
        .instrument(span)
        .await
    }

    /// Cached value for `key`, ignoring freshness
    #[must_use]
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// Fetch in flight for `key`, if any
    #[must_use]
    pub fn pending(&self, key: &CacheKey) -> Option<PendingFetch<V>> {
        self.state
            .lock()
            .in_flight
            .get(key)
            .map(|in_flight| in_flight.future.clone())
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<CacheKey> {
        self.state.lock().entries.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Remove matching entries and cancel matching fetches. Returns the number
    /// of entries removed.
    pub fn invalidate(&self, scope: InvalidationScope) -> usize {
        let mut state = self.state.lock();
        let before = state.entries.len();

        if scope == InvalidationScope::All {
            state.epoch.cancel();
            state.epoch = CancellationToken::new();
            state.in_flight.clear();
            state.entries.clear();
        } else {
            state.entries.retain(|key, _| !scope.matches(key));
            state.in_flight.retain(|key, in_flight| {
                let keep = !scope.matches(key);
                if !keep {
                    in_flight.token.cancel();
                }
                keep
            });
        }

        let removed = before - state.entries.len();
        state.counters.invalidations += removed as u64;
        drop(state);

        tracing::debug!(cache.name = self.name, ?scope, removed, "Cache invalidated");
        removed
    }

    /// Remove every entry and cancel every fetch
    pub fn clear(&self) {
        self.invalidate(InvalidationScope::All);
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let c = &state.counters;
        CacheStats {
            hits: c.hits,
            stale_hits: c.stale_hits,
            misses: c.misses,
            fetches: c.fetches,
            dedup_joins: c.dedup_joins,
            fetch_errors: c.fetch_errors,
            discarded: c.discarded,
            invalidations: c.invalidations,
            evictions: c.evictions,
            entry_count: state.entries.len() as u64,
            in_flight: state.in_flight.len() as u64,
        }
    }

    fn lookup_entry(&self, state: &mut CacheState<V>, key: &CacheKey) -> Option<Lookup<V>> {
        let entry = state.entries.get(key)?;
        let stale = entry.fetched_at.elapsed() >= self.config.staleness_window;
        let lookup = Lookup {
            value: Arc::clone(&entry.value),
            freshness: if stale {
                Freshness::Stale
            } else {
                Freshness::Fresh
            },
            refreshing: state.in_flight.contains_key(key),
            last_error: entry.last_error.clone(),
        };

        if stale {
            state.counters.stale_hits += 1;
            tracing::debug!(cache.result = "stale", refreshing = lookup.refreshing);
        } else {
            state.counters.hits += 1;
            tracing::debug!(cache.result = "hit");
        }
        Some(lookup)
    }

    fn join_or_start<F, Fut>(
        &self,
        state: &mut CacheState<V>,
        key: &CacheKey,
        liveness: Option<CancellationToken>,
        fetch: F,
    ) -> PendingFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        if let Some(in_flight) = state.in_flight.get_mut(key) {
            in_flight.waiters.add(liveness);
            let future = in_flight.future.clone();
            state.counters.dedup_joins += 1;
            tracing::debug!(cache.key = %key, "Joining fetch in flight");
            return future;
        }
        self.start_fetch(state, key, liveness, fetch())
    }

    fn start_fetch<Fut>(
        &self,
        state: &mut CacheState<V>,
        key: &CacheKey,
        liveness: Option<CancellationToken>,
        fetch: Fut,
    ) -> PendingFetch<V>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.counters.fetches += 1;
        let token = state.epoch.child_token();

        let task = FetchTask {
            state: Arc::clone(&self.state),
            config: self.config,
            key: key.clone(),
            ticket,
            token: token.clone(),
        };
        let handle = tokio::spawn(task.run(fetch).in_current_span());
        let future = handle
            .map(|joined| {
                joined.unwrap_or_else(|e| Err(Error::Unknown(format!("fetch task failed: {e}"))))
            })
            .boxed()
            .shared();

        let mut waiters = Waiters::default();
        waiters.add(liveness);
        state.in_flight.insert(
            key.clone(),
            InFlight {
                ticket,
                token,
                future: future.clone(),
                waiters,
            },
        );
        future
    }
}

struct FetchTask<V> {
    state: Arc<Mutex<CacheState<V>>>,
    config: CacheConfig,
    key: CacheKey,
    ticket: u64,
    token: CancellationToken,
}

impl<V: SiteOwned> FetchTask<V> {
    async fn run<Fut>(self, fetch: Fut) -> Result<Arc<V>>
    where
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let mut guard = InFlightGuard {
            state: Arc::clone(&self.state),
            key: self.key.clone(),
            ticket: self.ticket,
            armed: true,
        };
        let outcome = fetch.await;

        let mut state = self.state.lock();
        guard.armed = false;
        let abandoned = match state.in_flight.get(&self.key) {
            Some(in_flight) if in_flight.ticket == self.ticket => {
                let gone = in_flight.waiters.all_gone();
                state.in_flight.remove(&self.key);
                gone
            }
            _ => false,
        };
        let cancelled = abandoned || self.token.is_cancelled();

        match outcome {
            Err(err) => {
                state.counters.fetch_errors += 1;
                if !cancelled && let Some(entry) = state.entries.get_mut(&self.key) {
                    entry.last_error = Some(err.clone());
                    tracing::warn!(cache.key = %self.key, error = %err, "Refresh failed; keeping cached value");
                } else {
                    tracing::debug!(cache.key = %self.key, error = %err, "Fetch failed");
                }
                Err(err)
            }
            Ok(_) if cancelled => {
                state.counters.discarded += 1;
                tracing::debug!(cache.key = %self.key, "Discarding result of cancelled fetch");
                Err(Error::Cancelled)
            }
            Ok(value) => {
                if let Err(err) = value.validate_site(self.key.site_id()) {
                    state.counters.fetch_errors += 1;
                    return Err(err);
                }
                let value = Arc::new(value);
                state.store(self.config, self.key, Arc::clone(&value));
                Ok(value)
            }
        }
    }
}

/// Drops the in-flight entry of a fetch task that ends without completing,
/// so later lookups start a new fetch instead of joining a dead one
struct InFlightGuard<V> {
    state: Arc<Mutex<CacheState<V>>>,
    key: CacheKey,
    ticket: u64,
    armed: bool,
}

impl<V> Drop for InFlightGuard<V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock();
        if state
            .in_flight
            .get(&self.key)
            .is_some_and(|in_flight| in_flight.ticket == self.ticket)
        {
            state.in_flight.remove(&self.key);
            state.counters.fetch_errors += 1;
            tracing::warn!(cache.key = %self.key, "Fetch task ended without a result");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::types::{Interaction, InteractionId, InteractionType, SiteId};

    fn record(id: i64, site: i64, title: &str) -> Interaction {
        Interaction {
            id: InteractionId(id),
            site_id: SiteId(site),
            title: title.into(),
            interaction_type: InteractionType::Meeting,
            lead: "Ada".into(),
            start_datetime: Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap(),
            timezone: "UTC".into(),
            end_datetime: None,
            location: None,
            description: None,
            notes: None,
            created_by: None,
            created_at: None,
            updated_by: None,
            updated_at: None,
        }
    }

    fn key(site: i64, id: i64) -> CacheKey {
        CacheKey::record(SiteId(site), InteractionId(id))
    }

    fn cache() -> QueryCache<Interaction> {
        QueryCache::new("records", CacheConfig::default())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = cache();
        let k = key(1, 1);

        let first = cache
            .get(&k, None, || async { Ok(record(1, 1, "a")) })
            .await
            .unwrap();
        assert_eq!(first.freshness, Freshness::Fetched);

        let second = cache
            .get(&k, None, || async { panic!("must not fetch on a fresh hit") })
            .await
            .unwrap();
        assert_eq!(second.freshness, Freshness::Fresh);
        assert!(Arc::ptr_eq(&first.value, &second.value));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_gets_share_one_fetch() {
        let cache = cache();
        let k = key(1, 1);
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(record(1, 1, "shared"))
            }
        };

        let (a, b) = tokio::join!(
            cache.get(&k, None, fetch(Arc::clone(&calls))),
            cache.get(&k, None, fetch(Arc::clone(&calls))),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a.value, &b.value));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().dedup_joins, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_served_and_refreshed() {
        let cache = cache();
        let k = key(1, 1);

        cache
            .get(&k, None, || async { Ok(record(1, 1, "old")) })
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(31)).await;

        let stale = cache
            .get(&k, None, || async { Ok(record(1, 1, "new")) })
            .await
            .unwrap();
        assert!(stale.is_stale());
        assert!(stale.refreshing);
        assert_eq!(stale.value.title, "old");

        let refreshed = cache.pending(&k).unwrap().await.unwrap();
        assert_eq!(refreshed.title, "new");

        let fresh = cache
            .get(&k, None, || async { panic!("fresh after refresh") })
            .await
            .unwrap();
        assert_eq!(fresh.freshness, Freshness::Fresh);
        assert_eq!(fresh.value.title, "new");
        assert_eq!(cache.stats().stale_hits, 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_creates_no_entry() {
        let cache = cache();
        let k = key(1, 1);

        let err = cache
            .get(&k, None, || async {
                Err::<Interaction, _>(Error::Network("refused".into()))
            })
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert!(!cache.contains(&k));
        assert_eq!(cache.stats().fetch_errors, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_prior_value() {
        let cache = cache();
        let k = key(1, 1);

        cache
            .get(&k, None, || async { Ok(record(1, 1, "kept")) })
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        let err = cache
            .refetch(&k, None, || async {
                Err::<Interaction, _>(Error::Timeout(Duration::from_secs(30)))
            })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(cache.peek(&k).unwrap().title, "kept");

        let stale = cache
            .get(&k, None, || async {
                Err::<Interaction, _>(Error::Network("down".into()))
            })
            .await
            .unwrap();
        assert!(stale.last_error.as_ref().is_some_and(Error::is_timeout));
    }

    #[tokio::test]
    async fn test_foreign_site_value_rejected() {
        let cache = cache();
        let k = key(1, 5);

        let err = cache
            .get(&k, None, || async { Ok(record(5, 2, "leak")) })
            .await
            .unwrap_err();
        assert!(err.is_authorization());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_cancels_in_flight_fetch() {
        let cache = cache();
        let k = key(1, 1);

        let waiter = {
            let cache = cache.clone();
            let k = k.clone();
            tokio::spawn(async move {
                cache
                    .get(&k, None, || async {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Ok(record(1, 1, "late"))
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(cache.pending(&k).is_some());

        cache.clear();
        let err = waiter.await.unwrap().unwrap_err();
        assert_eq!(err, Error::Cancelled);
        assert!(!cache.contains(&k));
        assert_eq!(cache.stats().discarded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_liveness_skips_commit() {
        let cache = cache();
        let k = key(1, 1);
        let liveness = CancellationToken::new();

        let get = cache.get(&k, Some(&liveness), || async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(record(1, 1, "orphan"))
        });
        liveness.cancel();
        assert_eq!(get.await.unwrap_err(), Error::Cancelled);
        assert!(!cache.contains(&k));
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_waiter_keeps_shared_fetch() {
        let cache = cache();
        let k = key(1, 1);
        let gone = CancellationToken::new();
        let fetch = || async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(record(1, 1, "shared"))
        };

        let (first, second, ()) = tokio::join!(
            cache.get(&k, Some(&gone), fetch),
            async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                cache.get(&k, None, fetch).await
            },
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                gone.cancel();
            },
        );

        assert_eq!(first.unwrap_err(), Error::Cancelled);
        assert_eq!(second.unwrap().value.title, "shared");
        assert!(cache.contains(&k));
        let stats = cache.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.discarded, 0);
    }

    #[tokio::test]
    async fn test_panicked_fetch_releases_key() {
        let cache = cache();
        let k = key(1, 1);

        let err = cache
            .get(&k, None, || async { panic!("gateway bug") })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unknown(_)));
        assert!(cache.pending(&k).is_none());

        let retried = cache
            .get(&k, None, || async { Ok(record(1, 1, "retried")) })
            .await
            .unwrap();
        assert_eq!(retried.value.title, "retried");
        assert_eq!(cache.stats().fetches, 2);
    }

    #[tokio::test]
    async fn test_scoped_invalidation() {
        let cache = cache();
        for (site, id) in [(1, 1), (1, 2), (2, 3)] {
            cache
                .get(&key(site, id), None, move || async move {
                    Ok(record(id, site, "x"))
                })
                .await
                .unwrap();
        }

        let removed = cache.invalidate(InvalidationScope::Record {
            site_id: SiteId(1),
            id: InteractionId(2),
        });
        assert_eq!(removed, 1);
        assert_eq!(cache.invalidate(InvalidationScope::AllForSite(SiteId(1))), 1);
        assert_eq!(cache.keys(), vec![key(2, 3)]);
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_oldest_entry_evicted_at_capacity() {
        let cache: QueryCache<Interaction> =
            QueryCache::new("records", CacheConfig::new().with_max_entries(2));
        for id in 1..=3 {
            cache
                .get(&key(1, id), None, move || async move {
                    Ok(record(id, 1, "x"))
                })
                .await
                .unwrap();
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(1, 1)));
        assert!(cache.contains(&key(1, 3)));
        assert_eq!(cache.stats().evictions, 1);
    }
}
