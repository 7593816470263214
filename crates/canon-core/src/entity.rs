//! # Entity Protocol
//!
//! Identity-bearing, versioned, mutable values.
//!
//! Application types implement [`EntityState`]; the engine wraps them in an
//! [`Entity`], which is shared as [`Shared`] (`Arc<Entity<S>>`) between the
//! caches and every observer. Updates mutate the wrapped state in place, so
//! anyone holding the `Arc` sees the new state without rebinding.
//!
//! ## Change Notification
//!
//! Every applied update bumps the entity version and fires one change
//! notification. Inside an [`UpdateScope`] notifications are deferred; the
//! outermost scope fires a single notification on exit if anything changed.
//!
//! Nesting counters assume one writer per entity at a time. Concurrent
//! mutation of the same entity must be serialized by the caller.

use crate::key::{Key, ToKey};
use crate::CanonError;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// =============================================================================
// CONTRACTS
// =============================================================================

/// Bounds required of an entity identity.
///
/// Blanket-implemented for every type that satisfies them.
pub trait Identity: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + ToKey + 'static {}

impl<T> Identity for T where T: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync + ToKey + 'static {}

/// State contract implemented by application data types.
///
/// Only `id` is required. The defaults give value-replacement semantics:
/// a source is compatible when it has the same identity, and an update
/// copies the whole source state.
pub trait EntityState: Clone + Send + Sync + 'static {
    /// The identity type distinguishing one real-world entity from another.
    type Id: Identity;

    /// The current identity.
    fn id(&self) -> Self::Id;

    /// Derive the structural key. `None` means the key is unavailable.
    fn derive_key(&self) -> Option<Key> {
        self.id().to_key()
    }

    /// Whether `source` may update this state.
    fn is_compatible(&self, source: &Self) -> bool {
        self.id() == source.id()
    }

    /// Whether `source` carries changes worth applying.
    ///
    /// Called only for distinct instances; the wrapper already skips
    /// self-updates.
    fn is_update_required(&self, source: &Self) -> bool {
        let _ = source;
        true
    }

    /// Copy mutable state from `source`.
    fn copy_from(&mut self, source: &Self) {
        self.clone_from(source);
    }

    /// Clone recursively, including owned sub-entities and collections.
    ///
    /// `Clone::clone` is the shallow variant.
    fn deep_clone(&self) -> Self {
        self.clone()
    }
}

// =============================================================================
// ENTITY
// =============================================================================

/// Canonical shared handle to an entity.
pub type Shared<S> = Arc<Entity<S>>;

/// Identifier returned by [`Entity::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

type ChangeObserver<S> = Arc<dyn Fn(&Entity<S>) + Send + Sync>;

/// Versioned, mutable wrapper around an [`EntityState`].
pub struct Entity<S: EntityState> {
    state: RwLock<S>,
    /// Lazily derived key, dropped whenever the identity changes.
    key: Mutex<Option<Key>>,
    version: AtomicU64,
    batch_depth: AtomicUsize,
    pending: AtomicBool,
    observers: Mutex<Vec<(ObserverId, ChangeObserver<S>)>>,
    next_observer: AtomicU64,
}

impl<S: EntityState> Entity<S> {
    /// Wrap a state value.
    #[must_use]
    pub fn new(state: S) -> Self {
        Self::with_version(state, 0, None)
    }

    /// Wrap a state value in a shared handle.
    #[must_use]
    pub fn shared(state: S) -> Shared<S> {
        Arc::new(Self::new(state))
    }

    fn with_version(state: S, version: u64, key: Option<Key>) -> Self {
        Self {
            state: RwLock::new(state),
            key: Mutex::new(key),
            version: AtomicU64::new(version),
            batch_depth: AtomicUsize::new(0),
            pending: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
            next_observer: AtomicU64::new(0),
        }
    }

    /// The current identity.
    pub fn id(&self) -> S::Id {
        self.state.read().id()
    }

    /// Number of updates applied to this instance.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Read the state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.state.read())
    }

    /// Clone the current state.
    pub fn snapshot(&self) -> S {
        self.state.read().clone()
    }

    /// The structural key, derived on first access and cached.
    pub fn key(&self) -> Result<Key, CanonError> {
        // Lock order is always state, then key.
        let state = self.state.read();
        let mut cached = self.key.lock();
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }
        let key = state
            .derive_key()
            .ok_or_else(|| CanonError::KeyUnavailable(format!("{:?}", state.id())))?;
        *cached = Some(key.clone());
        Ok(key)
    }

    /// Mutate the state in place.
    ///
    /// Counts as an update: bumps the version and raises (or defers) one
    /// change notification. An identity change drops the cached key.
    pub fn modify<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let result = {
            let mut state = self.state.write();
            let before = state.id();
            let result = f(&mut state);
            if state.id() != before {
                self.key.lock().take();
            }
            result
        };
        self.version.fetch_add(1, Ordering::AcqRel);
        self.changed();
        result
    }

    /// Update this instance in place from another entity.
    ///
    /// Returns `Ok(false)` when no update was required.
    pub fn update(&self, source: &Entity<S>) -> Result<bool, CanonError> {
        if std::ptr::eq(self, source) {
            return Ok(false);
        }
        // Snapshot first so two entities never hold each other's locks.
        let source = source.snapshot();
        self.update_from(&source)
    }

    /// Update this instance in place from a raw state value.
    ///
    /// Fails with [`CanonError::IncompatibleSource`] and leaves the state
    /// untouched when `source` is not compatible.
    pub fn update_from(&self, source: &S) -> Result<bool, CanonError> {
        {
            let mut state = self.state.write();
            if !state.is_compatible(source) {
                return Err(CanonError::IncompatibleSource {
                    expected: format!("{:?}", state.id()),
                    found: format!("{:?}", source.id()),
                });
            }
            if !state.is_update_required(source) {
                return Ok(false);
            }
            let before = state.id();
            state.copy_from(source);
            if state.id() != before {
                self.key.lock().take();
            }
        }
        self.version.fetch_add(1, Ordering::AcqRel);
        self.changed();
        Ok(true)
    }

    /// Create a new instance with identical observable state.
    ///
    /// A deep clone uses [`EntityState::deep_clone`]; a shallow clone shares
    /// owned sub-entities. Observers are not carried over.
    #[must_use]
    pub fn clone_entity(&self, deep: bool) -> Self {
        let state = self.state.read();
        let copy = if deep {
            state.deep_clone()
        } else {
            state.clone()
        };
        Self::with_version(copy, self.version(), self.key.lock().clone())
    }

    /// Open a batch scope. Notifications are deferred until the outermost
    /// scope is dropped.
    pub fn begin_update(&self) -> UpdateScope<'_, S> {
        self.batch_depth.fetch_add(1, Ordering::AcqRel);
        UpdateScope { entity: self }
    }

    /// Whether a batch scope is currently open.
    pub fn is_updating(&self) -> bool {
        self.batch_depth.load(Ordering::Acquire) > 0
    }

    /// Register a change observer.
    pub fn subscribe(&self, observer: impl Fn(&Entity<S>) + Send + Sync + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers.lock().push((id, Arc::new(observer)));
        id
    }

    /// Remove a change observer. Returns `false` if it was not registered.
    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.lock();
        let before = observers.len();
        observers.retain(|(observer, _)| *observer != id);
        observers.len() != before
    }

    fn changed(&self) {
        if self.is_updating() {
            self.pending.store(true, Ordering::Release);
        } else {
            self.notify();
        }
    }

    fn notify(&self) {
        // Observers run without the registry lock so they may subscribe.
        let observers: Vec<ChangeObserver<S>> =
            self.observers.lock().iter().map(|(_, o)| o.clone()).collect();
        for observer in observers {
            observer(self);
        }
    }
}

impl<S: EntityState + fmt::Debug> fmt::Debug for Entity<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("state", &*self.state.read())
            .field("version", &self.version())
            .finish()
    }
}

// =============================================================================
// UPDATE SCOPE
// =============================================================================

/// RAII batch scope returned by [`Entity::begin_update`].
#[must_use = "dropping the scope immediately ends the batch"]
pub struct UpdateScope<'a, S: EntityState> {
    entity: &'a Entity<S>,
}

impl<S: EntityState> Drop for UpdateScope<'_, S> {
    fn drop(&mut self) {
        let previous = self.entity.batch_depth.fetch_sub(1, Ordering::AcqRel);
        if previous == 1 && self.entity.pending.swap(false, Ordering::AcqRel) {
            self.entity.notify();
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Account {
        id: u64,
        name: String,
        tags: Arc<Vec<String>>,
    }

    impl Account {
        fn new(id: u64, name: &str) -> Self {
            Self {
                id,
                name: name.to_string(),
                tags: Arc::new(vec!["a".to_string()]),
            }
        }
    }

    impl EntityState for Account {
        type Id = u64;

        fn id(&self) -> u64 {
            self.id
        }

        fn is_update_required(&self, source: &Self) -> bool {
            self != source
        }

        fn deep_clone(&self) -> Self {
            Self {
                tags: Arc::new((*self.tags).clone()),
                ..self.clone()
            }
        }
    }

    fn counter(entity: &Entity<Account>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        entity.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[test]
    fn update_mutates_in_place_and_notifies_once() {
        let entity = Entity::new(Account::new(1, "old"));
        let notified = counter(&entity);

        let changed = entity
            .update_from(&Account::new(1, "new"))
            .expect("compatible");

        assert!(changed);
        assert_eq!(entity.read(|s| s.name.clone()), "new");
        assert_eq!(entity.version(), 1);
        assert_eq!(notified.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn update_skipped_when_not_required() {
        let entity = Entity::new(Account::new(1, "same"));
        let notified = counter(&entity);

        let changed = entity
            .update_from(&Account::new(1, "same"))
            .expect("compatible");

        assert!(!changed);
        assert_eq!(entity.version(), 0);
        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn self_update_is_not_required() {
        let entity = Entity::new(Account::new(1, "x"));
        assert!(!entity.update(&entity).expect("self"));
    }

    #[test]
    fn incompatible_source_rejected_without_mutation() {
        let entity = Entity::new(Account::new(1, "keep"));
        let other = Entity::new(Account::new(2, "other"));

        let result = entity.update(&other);

        assert!(matches!(
            result,
            Err(CanonError::IncompatibleSource { .. })
        ));
        assert_eq!(entity.read(|s| s.name.clone()), "keep");
        assert_eq!(entity.version(), 0);
    }

    #[test]
    fn nested_batch_fires_single_notification_on_final_exit() {
        let entity = Entity::new(Account::new(1, "a"));
        let notified = counter(&entity);

        {
            let _outer = entity.begin_update();
            {
                let _inner = entity.begin_update();
                entity.update_from(&Account::new(1, "b")).expect("update");
                entity.update_from(&Account::new(1, "c")).expect("update");
            }
            assert_eq!(notified.load(Ordering::SeqCst), 0);
            assert!(entity.is_updating());
        }

        assert!(!entity.is_updating());
        assert_eq!(notified.load(Ordering::SeqCst), 1);
        assert_eq!(entity.version(), 2);
    }

    #[test]
    fn batch_without_changes_fires_nothing() {
        let entity = Entity::new(Account::new(1, "a"));
        let notified = counter(&entity);

        drop(entity.begin_update());

        assert_eq!(notified.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn identity_change_invalidates_cached_key() {
        let entity = Entity::new(Account::new(1, "a"));
        assert_eq!(entity.key().expect("key"), Key::root(1u64));

        entity.modify(|s| s.id = 9);

        assert_eq!(entity.key().expect("key"), Key::root(9u64));
    }

    #[test]
    fn unavailable_key_is_reported_on_access() {
        #[derive(Debug, Clone)]
        struct Draft {
            id: Option<u64>,
        }

        impl EntityState for Draft {
            type Id = Option<u64>;

            fn id(&self) -> Option<u64> {
                self.id
            }
        }

        let draft = Entity::new(Draft { id: None });
        assert!(matches!(draft.key(), Err(CanonError::KeyUnavailable(_))));

        draft.modify(|s| s.id = Some(3));
        assert_eq!(draft.key().expect("key"), Key::root(3u64));
    }

    #[test]
    fn shallow_clone_shares_and_deep_clone_copies() {
        let entity = Entity::new(Account::new(1, "a"));

        let shallow = entity.clone_entity(false);
        let deep = entity.clone_entity(true);

        let original_tags = entity.read(|s| s.tags.clone());
        assert!(Arc::ptr_eq(&original_tags, &shallow.read(|s| s.tags.clone())));
        assert!(!Arc::ptr_eq(&original_tags, &deep.read(|s| s.tags.clone())));
        assert_eq!(deep.snapshot(), entity.snapshot());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let entity = Entity::new(Account::new(1, "a"));
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let id = entity.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(entity.unsubscribe(id));
        assert!(!entity.unsubscribe(id));
        entity.modify(|s| s.name = "b".to_string());

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
