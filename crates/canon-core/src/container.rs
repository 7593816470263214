//! # Result Containers
//!
//! Identity-deduplicated collections of canonical entities.
//!
//! The caches are generic over the container they store query results in;
//! [`EntitySet`] is the provided implementation.

use crate::entity::{EntityState, Shared};
use indexmap::IndexMap;
use std::fmt;

/// Collection contract for cached query results.
///
/// Implementations must reject a second entity with an identity already
/// present.
pub trait EntityContainer<S: EntityState>: Default + Clone + Send + Sync + 'static {
    /// Insert an entity. Returns `false` (and keeps the existing entry) if
    /// an entity with the same identity is already present.
    fn insert(&mut self, entity: Shared<S>) -> bool;

    /// Remove the entity with the given identity.
    fn remove(&mut self, id: &S::Id) -> Option<Shared<S>>;

    /// Look up an entity by identity.
    fn get(&self, id: &S::Id) -> Option<&Shared<S>>;

    /// Iterate the entities.
    fn iter(&self) -> impl Iterator<Item = &Shared<S>>;

    /// Number of entities.
    fn len(&self) -> usize;

    /// Whether an entity with the given identity is present.
    fn contains(&self, id: &S::Id) -> bool {
        self.get(id).is_some()
    }

    /// Whether the container is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered, identity-indexed set of canonical entities.
pub struct EntitySet<S: EntityState> {
    entries: IndexMap<S::Id, Shared<S>>,
}

impl<S: EntityState> EntitySet<S> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identities in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &S::Id> {
        self.entries.keys()
    }
}

impl<S: EntityState> Default for EntitySet<S> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }
}

impl<S: EntityState> Clone for EntitySet<S> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<S: EntityState> fmt::Debug for EntitySet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl<S: EntityState> EntityContainer<S> for EntitySet<S> {
    fn insert(&mut self, entity: Shared<S>) -> bool {
        let id = entity.id();
        if self.entries.contains_key(&id) {
            return false;
        }
        self.entries.insert(id, entity);
        true
    }

    fn remove(&mut self, id: &S::Id) -> Option<Shared<S>> {
        self.entries.shift_remove(id)
    }

    fn get(&self, id: &S::Id) -> Option<&Shared<S>> {
        self.entries.get(id)
    }

    fn iter(&self) -> impl Iterator<Item = &Shared<S>> {
        self.entries.values()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<S: EntityState> FromIterator<Shared<S>> for EntitySet<S> {
    fn from_iter<I: IntoIterator<Item = Shared<S>>>(iter: I) -> Self {
        let mut set = Self::new();
        for entity in iter {
            set.insert(entity);
        }
        set
    }
}
