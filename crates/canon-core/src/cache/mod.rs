//! # Entity Cache
//!
//! The canonical store: one live instance per identity, plus query results
//! kept current as objects are cached.
//!
//! ## Tables
//!
//! - Object table: identity → weak handle to the canonical instance. An
//!   entry dies when the application drops its last strong reference; it is
//!   evicted by the next lookup or sweep that observes it.
//! - Query table: query → [`CachedQuery`], in insertion order. An entry
//!   lives while at least one of its cookies is alive.
//!
//! Each table has its own lock. User callbacks (events, match predicates)
//! always run with no table lock held.

mod cookie;
mod entry;

pub use cookie::Cookie;
pub use entry::CachedQuery;

use crate::config::{self, CacheConfig};
use crate::container::{EntityContainer, EntitySet};
use crate::entity::{Entity, EntityState, Shared};
use crate::merge::{self, MergePolicy, MergeReport};
use crate::query::{Query, QuerySpec};
use crate::sweeper::{Sweepable, Sweeper};
use crate::CanonError;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

// =============================================================================
// EVENTS
// =============================================================================

/// Response a match hook fills in to override the default membership
/// decision for one query entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchResponse {
    /// Set to take over the decision.
    pub processed: bool,
    /// The decision, read only when `processed` is set.
    pub matched: bool,
}

type CachedHook<S> = Arc<dyn Fn(&Shared<S>) + Send + Sync>;
type MatchHook<S, Q> = Arc<dyn Fn(&Q, &Shared<S>, &mut MatchResponse) + Send + Sync>;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SweepReport {
    pub objects_removed: usize,
    pub queries_removed: usize,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    /// Object entries, dead or alive.
    pub objects: usize,
    /// Object entries whose instance is still alive.
    pub live_objects: usize,
    /// Cached queries.
    pub queries: usize,
    /// Completed sweeps.
    pub sweeps: u64,
}

// =============================================================================
// ENTITY CACHE
// =============================================================================

/// Identity-preserving object cache with a query-result cache on top.
pub struct EntityCache<S, Q = Query<S>, C = EntitySet<S>>
where
    S: EntityState,
    Q: QuerySpec<S>,
    C: EntityContainer<S>,
{
    objects: Mutex<BTreeMap<S::Id, Weak<Entity<S>>>>,
    queries: Mutex<IndexMap<Q, CachedQuery<Q, C>>>,
    config: Mutex<CacheConfig>,
    cached_hooks: Mutex<Vec<CachedHook<S>>>,
    match_hooks: Mutex<Vec<MatchHook<S, Q>>>,
    /// Re-entrancy guard: a sweep attempted while one runs is skipped.
    sweeping: AtomicBool,
    sweeps: AtomicU64,
    sweeper: Mutex<Option<Sweeper>>,
}

impl<S, Q, C> EntityCache<S, Q, C>
where
    S: EntityState,
    Q: QuerySpec<S>,
    C: EntityContainer<S>,
{
    /// Create a cache. No timer runs until [`EntityCache::start_sweeper`].
    pub fn new(config: CacheConfig) -> Result<Self, CanonError> {
        config.validate()?;
        Ok(Self {
            objects: Mutex::new(BTreeMap::new()),
            queries: Mutex::new(IndexMap::new()),
            config: Mutex::new(config),
            cached_hooks: Mutex::new(Vec::new()),
            match_hooks: Mutex::new(Vec::new()),
            sweeping: AtomicBool::new(false),
            sweeps: AtomicU64::new(0),
            sweeper: Mutex::new(None),
        })
    }

    /// Create a shared cache with its sweep timer running.
    pub fn with_sweeper(config: CacheConfig) -> Result<Arc<Self>, CanonError> {
        let cache = Arc::new(Self::new(config)?);
        cache.start_sweeper()?;
        Ok(cache)
    }

    /// Start the sweep timer. No-op if it is already running.
    pub fn start_sweeper(self: &Arc<Self>) -> Result<(), CanonError> {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_none() {
            let interval = self.config.lock().cleanup_interval();
            *sweeper = Some(Sweeper::spawn(Arc::downgrade(self), interval)?);
            debug!(interval_ms = config::duration_millis(interval), "sweeper started");
        }
        Ok(())
    }

    /// Stop the sweep timer, if running.
    pub fn stop_sweeper(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Current configuration.
    pub fn config(&self) -> CacheConfig {
        self.config.lock().clone()
    }

    /// Change the sweep interval, rescheduling a running timer.
    ///
    /// The interval must be a non-zero whole number of milliseconds.
    pub fn set_cleanup_interval(&self, interval: Duration) -> Result<(), CanonError> {
        config::validate_interval(interval)?;
        self.config.lock().cleanup_interval_ms = config::duration_millis(interval);
        if let Some(sweeper) = self.sweeper.lock().as_ref() {
            sweeper.reschedule(interval)?;
        }
        Ok(())
    }

    /// Enable or disable timer-driven sweeps. Explicit [`EntityCache::sweep`]
    /// calls are unaffected.
    pub fn set_cleanup_enabled(&self, enabled: bool) {
        self.config.lock().cleanup_enabled = enabled;
    }

    /// Enable or disable the query conversion fallback.
    pub fn set_query_conversion(&self, enabled: bool) {
        self.config.lock().query_conversion = enabled;
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Register a callback fired when a new identity enters the cache.
    pub fn on_object_cached(&self, hook: impl Fn(&Shared<S>) + Send + Sync + 'static) {
        self.cached_hooks.lock().push(Arc::new(hook));
    }

    /// Register a callback fired once per cached query whenever an object is
    /// cached. Setting `processed` overrides the query's own match decision.
    pub fn on_match(
        &self,
        hook: impl Fn(&Q, &Shared<S>, &mut MatchResponse) + Send + Sync + 'static,
    ) {
        self.match_hooks.lock().push(Arc::new(hook));
    }

    // =========================================================================
    // OBJECT CACHE
    // =========================================================================

    /// The canonical instance for `id`, if cached and alive.
    ///
    /// A dead entry is evicted on the way.
    pub fn get(&self, id: &S::Id) -> Option<Shared<S>> {
        let mut objects = self.objects.lock();
        let upgraded = objects.get(id).map(Weak::upgrade)?;
        if upgraded.is_none() {
            objects.remove(id);
            trace!(id = ?id, "evicted dead object on lookup");
        }
        upgraded
    }

    /// Cache an object and return the canonical instance.
    ///
    /// A new identity stores `obj` itself and fires the object-cached event.
    /// A known identity updates the canonical instance from `obj` and
    /// returns the canonical instance, never `obj`.
    pub fn cache_object(&self, obj: Shared<S>) -> Result<Shared<S>, CanonError> {
        let id = obj.id();
        let existing = {
            let mut objects = self.objects.lock();
            match objects.get(&id).and_then(Weak::upgrade) {
                Some(canonical) => Some(canonical),
                None => {
                    objects.insert(id.clone(), Arc::downgrade(&obj));
                    None
                }
            }
        };

        let canonical = match existing {
            Some(canonical) => {
                let updated = canonical.update(&obj)?;
                trace!(id = ?id, updated, "object already cached");
                canonical
            }
            None => {
                trace!(id = ?id, "object cached");
                let hooks: Vec<CachedHook<S>> = self.cached_hooks.lock().clone();
                for hook in hooks {
                    hook(&obj);
                }
                obj
            }
        };

        self.notify_match(&canonical);
        Ok(canonical)
    }

    /// Wrap a state value and cache it.
    pub fn cache_state(&self, state: S) -> Result<Shared<S>, CanonError> {
        self.cache_object(Entity::shared(state))
    }

    /// Cache every object, collecting the canonical instances.
    ///
    /// Compatibility with already cached instances is checked up front, so
    /// an incompatible element rejects the whole collection unchanged.
    pub fn cache_collection<I>(&self, items: I) -> Result<C, CanonError>
    where
        I: IntoIterator<Item = Shared<S>>,
    {
        let items: Vec<Shared<S>> = items.into_iter().collect();
        self.check_compatible(&items)?;

        let mut result = C::default();
        for item in items {
            result.insert(self.cache_object(item)?);
        }
        Ok(result)
    }

    /// Reconcile a caller-held view with an incoming snapshot, then make
    /// every element of the view canonical.
    ///
    /// Every object that will end up in the view is checked against the
    /// cached instances first; a rejected call leaves the view, its objects
    /// and the cache untouched.
    pub fn merge_collection(
        &self,
        view: &mut Vec<Option<Shared<S>>>,
        incoming: &[Option<Shared<S>>],
        policy: MergePolicy,
    ) -> Result<MergeReport, CanonError> {
        if policy.is_empty() {
            return Ok(MergeReport::default());
        }
        let incoming_ids: HashSet<S::Id> = incoming.iter().flatten().map(|e| e.id()).collect();
        let survivors = view.iter().flatten().filter(|item| {
            !policy.contains(MergePolicy::REMOVE_OLD) || incoming_ids.contains(&item.id())
        });
        let candidates: Vec<Shared<S>> = incoming
            .iter()
            .flatten()
            .chain(survivors)
            .cloned()
            .collect();
        self.check_compatible(&candidates)?;

        let mut merged = view.clone();
        let report = merge::merge(&mut merged, incoming, policy)?;
        if report.is_empty() {
            return Ok(report);
        }
        for slot in merged.iter_mut() {
            if let Some(item) = slot {
                let canonical = self.cache_object(item.clone())?;
                if !Arc::ptr_eq(&canonical, item) {
                    *item = canonical;
                }
            }
        }
        *view = merged;
        debug!(
            added = report.added,
            removed = report.removed,
            updated = report.updated,
            "collection merged"
        );
        Ok(report)
    }

    /// Remove the canonical instance for `id` from the object table and from
    /// every cached query result.
    pub fn uncache_object(&self, id: &S::Id) -> Option<Shared<S>> {
        let removed = self.objects.lock().remove(id).and_then(|w| w.upgrade());
        let mut queries = self.queries.lock();
        let mut from_results = None;
        for entry in queries.values_mut() {
            if let Some(entity) = entry.result.remove(id) {
                from_results.get_or_insert(entity);
            }
        }
        debug!(id = ?id, "object uncached");
        removed.or(from_results)
    }

    // =========================================================================
    // QUERY CACHE
    // =========================================================================

    /// Exact structural lookup.
    pub fn get_cached_query(&self, query: &Q) -> Option<C> {
        self.queries
            .lock()
            .get(query)
            .map(|entry| entry.result.clone())
    }

    /// Fetch a query result, registering `cookie` on it.
    ///
    /// On a miss with conversion enabled, the first cached query (in
    /// insertion order) that can satisfy `query` is filtered through
    /// `query`'s match predicate. With a cookie the filtered result is
    /// cached as a new entry; without one it is returned uncached. Returns
    /// `None` when nothing can answer the query.
    pub fn get_query(&self, query: &Q, cookie: Option<&Cookie>) -> Option<C> {
        {
            let mut queries = self.queries.lock();
            if let Some(entry) = queries.get_mut(query) {
                if let Some(cookie) = cookie {
                    entry.add_cookie(cookie);
                }
                trace!(query = ?query, "query cache hit");
                return Some(entry.result.clone());
            }
        }

        if !self.config.lock().query_conversion || !query.supports_match() {
            trace!(query = ?query, "query cache miss");
            return None;
        }

        let source = {
            let queries = self.queries.lock();
            queries
                .values()
                .find(|entry| entry.query().can_satisfy(query))
                .map(|entry| entry.result.clone())
        };
        let Some(source) = source else {
            trace!(query = ?query, "query cache miss, no convertible entry");
            return None;
        };

        let mut converted = C::default();
        for entity in source.iter() {
            if entity.read(|state| query.matches(state)) {
                converted.insert(entity.clone());
            }
        }
        debug!(query = ?query, size = converted.len(), "query converted");

        match cookie {
            Some(cookie) => Some(self.add_cached_query(query, converted, Some(cookie))),
            None => Some(converted),
        }
    }

    /// Store `result` for `query` unless an entry exists; either way
    /// register `cookie` and return the stored result.
    pub fn add_cached_query(&self, query: &Q, result: C, cookie: Option<&Cookie>) -> C {
        let mut queries = self.queries.lock();
        let entry = queries.entry(query.clone()).or_insert_with(|| {
            debug!(query = ?query, size = result.len(), "query cached");
            CachedQuery::new(query.clone(), result)
        });
        if let Some(cookie) = cookie {
            entry.add_cookie(cookie);
        }
        entry.result.clone()
    }

    /// Canonicalize `items` through the object cache and store them as the
    /// result of `query`.
    ///
    /// When an entry already exists only `cookie` is registered; `items` are
    /// not cached and the stored result is returned.
    pub fn cache_query<I>(&self, query: &Q, items: I, cookie: Option<&Cookie>) -> Result<C, CanonError>
    where
        I: IntoIterator<Item = Shared<S>>,
    {
        {
            let mut queries = self.queries.lock();
            if let Some(entry) = queries.get_mut(query) {
                if let Some(cookie) = cookie {
                    entry.add_cookie(cookie);
                }
                trace!(query = ?query, "query already cached");
                return Ok(entry.result.clone());
            }
        }
        let result = self.cache_collection(items)?;
        Ok(self.add_cached_query(query, result, cookie))
    }

    /// Unregister `cookie`. When no live cookie remains, the entry is
    /// removed immediately. Returns whether the entry was removed.
    pub fn release_cached_query(&self, query: &Q, cookie: &Cookie) -> bool {
        let mut queries = self.queries.lock();
        let Some(entry) = queries.get_mut(query) else {
            return false;
        };
        entry.remove_cookie(cookie);
        if entry.cookies_count() == 0 {
            queries.shift_remove(query);
            debug!(query = ?query, "query released");
            return true;
        }
        false
    }

    /// Live cookie count of a cached query (dead cookies are purged first).
    pub fn cookies_count(&self, query: &Q) -> Option<usize> {
        self.queries
            .lock()
            .get_mut(query)
            .map(CachedQuery::cookies_count)
    }

    // =========================================================================
    // MAINTENANCE
    // =========================================================================

    /// Remove dead object entries and query entries without live cookies.
    ///
    /// Returns `None` when skipped because another sweep is in progress.
    pub fn sweep(&self) -> Option<SweepReport> {
        if self
            .sweeping
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            trace!("sweep already in progress, skipped");
            return None;
        }

        let objects_removed = {
            let mut objects = self.objects.lock();
            let before = objects.len();
            objects.retain(|_, weak| weak.strong_count() > 0);
            before - objects.len()
        };
        let queries_removed = {
            let mut queries = self.queries.lock();
            let before = queries.len();
            queries.retain(|_, entry| entry.cookies_count() > 0);
            before - queries.len()
        };

        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.sweeping.store(false, Ordering::Release);
        debug!(objects_removed, queries_removed, "sweep complete");
        Some(SweepReport {
            objects_removed,
            queries_removed,
        })
    }

    /// Point-in-time counters.
    pub fn stats(&self) -> CacheStats {
        let (objects, live_objects) = {
            let table = self.objects.lock();
            let live = table.values().filter(|w| w.strong_count() > 0).count();
            (table.len(), live)
        };
        CacheStats {
            objects,
            live_objects,
            queries: self.queries.lock().len(),
            sweeps: self.sweeps.load(Ordering::Relaxed),
        }
    }

    /// Fail if any item would be rejected by its cached canonical instance.
    fn check_compatible(&self, items: &[Shared<S>]) -> Result<(), CanonError> {
        for item in items {
            let Some(canonical) = self.get(&item.id()) else {
                continue;
            };
            if Arc::ptr_eq(&canonical, item) {
                continue;
            }
            let source = item.snapshot();
            if !canonical.read(|state| state.is_compatible(&source)) {
                return Err(CanonError::IncompatibleSource {
                    expected: format!("{:?}", canonical.id()),
                    found: format!("{:?}", source.id()),
                });
            }
        }
        Ok(())
    }

    fn notify_match(&self, canonical: &Shared<S>) {
        let queries: Vec<Q> = self.queries.lock().keys().cloned().collect();
        if queries.is_empty() {
            return;
        }
        let hooks: Vec<MatchHook<S, Q>> = self.match_hooks.lock().clone();

        let mut decisions = Vec::with_capacity(queries.len());
        for query in queries {
            let mut response = MatchResponse::default();
            for hook in &hooks {
                hook(&query, canonical, &mut response);
            }
            let matched = if response.processed {
                response.matched
            } else if query.supports_match() {
                canonical.read(|state| query.matches(state))
            } else {
                continue;
            };
            decisions.push((query, matched));
        }

        let id = canonical.id();
        let mut table = self.queries.lock();
        for (query, matched) in decisions {
            let Some(entry) = table.get_mut(&query) else {
                continue;
            };
            if matched {
                if entry.result.insert(canonical.clone()) {
                    trace!(query = ?query, id = ?id, "entity joined query result");
                }
            } else if entry.result.remove(&id).is_some() {
                trace!(query = ?query, id = ?id, "entity left query result");
            }
        }
    }
}

impl<S, Q, C> Sweepable for EntityCache<S, Q, C>
where
    S: EntityState,
    Q: QuerySpec<S>,
    C: EntityContainer<S>,
{
    fn sweep_tick(&self) {
        if self.config.lock().cleanup_enabled {
            let _ = self.sweep();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Scalar;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u64,
        group: u64,
        label: String,
    }

    impl Item {
        fn new(id: u64, group: u64, label: &str) -> Self {
            Self {
                id,
                group,
                label: label.to_string(),
            }
        }
    }

    impl EntityState for Item {
        type Id = u64;

        fn id(&self) -> u64 {
            self.id
        }

        fn is_update_required(&self, source: &Self) -> bool {
            self != source
        }
    }

    type Cache = EntityCache<Item>;

    fn cache() -> Cache {
        EntityCache::new(CacheConfig::default()).expect("valid config")
    }

    fn all_items() -> Query<Item> {
        Query::<Item>::new("items")
            .expect("valid")
            .matching(|_, _| true)
    }

    fn by_group(group: u64) -> Query<Item> {
        Query::<Item>::new("items")
            .and_then(|q| q.param("group", group))
            .expect("valid")
            .matching(|item, params| params.get("group").and_then(Scalar::as_u64) == Some(item.group))
    }

    #[test]
    fn cache_object_returns_canonical_instance() {
        let cache = cache();
        let first = cache.cache_state(Item::new(1, 0, "a")).expect("cache");
        let second = Entity::shared(Item::new(1, 0, "b"));

        let canonical = cache.cache_object(second.clone()).expect("cache");

        assert!(Arc::ptr_eq(&canonical, &first));
        assert!(!Arc::ptr_eq(&canonical, &second));
        assert_eq!(first.read(|s| s.label.clone()), "b");
    }

    #[test]
    fn dead_entry_evicted_on_lookup() {
        let cache = cache();
        let item = cache.cache_state(Item::new(1, 0, "a")).expect("cache");
        drop(item);

        assert_eq!(cache.stats().objects, 1);
        assert!(cache.get(&1).is_none());
        assert_eq!(cache.stats().objects, 0);
    }

    #[test]
    fn object_cached_event_fires_for_new_identities_only() {
        let cache = cache();
        let fired = Arc::new(AtomicU64::new(0));
        let seen = fired.clone();
        cache.on_object_cached(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let _a = cache.cache_state(Item::new(1, 0, "a")).expect("cache");
        let _b = cache.cache_state(Item::new(1, 0, "b")).expect("cache");

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn incompatible_collection_rejected_unchanged() {
        #[derive(Debug, Clone)]
        struct Versioned {
            id: u64,
            rev: u64,
        }

        impl EntityState for Versioned {
            type Id = u64;

            fn id(&self) -> u64 {
                self.id
            }

            fn is_compatible(&self, source: &Self) -> bool {
                source.rev >= self.rev
            }
        }

        let cache: EntityCache<Versioned> =
            EntityCache::new(CacheConfig::default()).expect("config");
        let held = cache
            .cache_state(Versioned { id: 2, rev: 9 })
            .expect("cache");

        let result = cache.cache_collection([
            Entity::shared(Versioned { id: 1, rev: 1 }),
            Entity::shared(Versioned { id: 2, rev: 1 }),
        ]);

        assert!(matches!(result, Err(CanonError::IncompatibleSource { .. })));
        assert!(cache.get(&1).is_none());
        assert_eq!(held.read(|s| s.rev), 9);
    }

    #[test]
    fn uncache_removes_from_results() {
        let cache = cache();
        let cookie = Cookie::new();
        let items = vec![
            Entity::shared(Item::new(1, 0, "a")),
            Entity::shared(Item::new(2, 0, "b")),
        ];
        cache
            .cache_query(&all_items(), items.clone(), Some(&cookie))
            .expect("cache");

        let removed = cache.uncache_object(&1).expect("was cached");

        assert!(Arc::ptr_eq(&removed, &items[0]));
        assert!(cache.get(&1).is_none());
        let result = cache.get_cached_query(&all_items()).expect("cached");
        assert!(!result.contains(&1));
        assert!(result.contains(&2));
    }

    #[test]
    fn conversion_filters_broader_result() {
        let cache = cache();
        let cookie = Cookie::new();
        let items: Vec<_> = (1..=4)
            .map(|id| Entity::shared(Item::new(id, id % 2, "x")))
            .collect();
        cache
            .cache_query(&all_items(), items, Some(&cookie))
            .expect("cache");

        let uncached = cache.get_query(&by_group(1), None).expect("converted");
        let ids: Vec<u64> = uncached.ids().copied().collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(cache.get_cached_query(&by_group(1)).is_none());

        let narrow_cookie = Cookie::new();
        cache
            .get_query(&by_group(1), Some(&narrow_cookie))
            .expect("converted");
        assert_eq!(cache.cookies_count(&by_group(1)), Some(1));
    }

    #[test]
    fn conversion_disabled_misses() {
        let cache = cache();
        let cookie = Cookie::new();
        cache
            .cache_query(&all_items(), [Entity::shared(Item::new(1, 1, "x"))], Some(&cookie))
            .expect("cache");
        cache.set_query_conversion(false);

        assert!(cache.get_query(&by_group(1), None).is_none());
    }

    #[test]
    fn add_cached_query_is_idempotent() {
        let cache = cache();
        let a = Cookie::new();
        let b = Cookie::new();
        let first: EntitySet<Item> = [Entity::shared(Item::new(1, 0, "a"))].into_iter().collect();

        cache.add_cached_query(&all_items(), first, Some(&a));
        let stored = cache.add_cached_query(&all_items(), EntitySet::new(), Some(&b));

        assert_eq!(stored.len(), 1);
        assert_eq!(cache.cookies_count(&all_items()), Some(2));
    }

    #[test]
    fn skipped_sweep_while_in_progress() {
        let cache = cache();
        cache.sweeping.store(true, Ordering::SeqCst);
        assert!(cache.sweep().is_none());

        cache.sweeping.store(false, Ordering::SeqCst);
        assert!(cache.sweep().is_some());
        assert_eq!(cache.stats().sweeps, 1);
    }

    #[test]
    fn set_cleanup_interval_validates() {
        let cache = cache();
        assert!(cache.set_cleanup_interval(Duration::ZERO).is_err());
        cache
            .set_cleanup_interval(Duration::from_secs(30))
            .expect("valid");
        assert_eq!(cache.config().cleanup_interval_ms, 30_000);

        cache
            .set_cleanup_interval(Duration::from_millis(1500))
            .expect("valid");
        assert_eq!(cache.config().cleanup_interval(), Duration::from_millis(1500));
        assert!(cache.set_cleanup_interval(Duration::from_micros(500)).is_err());
        assert_eq!(cache.config().cleanup_interval_ms, 1500);
    }
}
