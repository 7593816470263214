//! # Hierarchical Keys
//!
//! A `Key` is an immutable cons structure: a local `Scalar` value plus an
//! optional parent key. Keys are shared by reference counting and never
//! mutated after construction, so cloning one is a pointer copy.
//!
//! ## Ordering and Hashing
//!
//! - Equality and ordering compare the parent chain first, then the local value.
//! - The hash is computed once at construction by combining the parent hash with
//!   the local value hash, and cached in the node.
//! - Equal keys always have equal hashes.

use crate::Scalar;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// =============================================================================
// KEY
// =============================================================================

/// Immutable hierarchical structural identity.
#[derive(Clone)]
pub struct Key(Arc<KeyNode>);

struct KeyNode {
    value: Scalar,
    parent: Option<Key>,
    hash: u64,
    depth: usize,
}

fn combine_hash(parent: Option<&Key>, value: &Scalar) -> u64 {
    let mut hasher = DefaultHasher::new();
    parent.map(|p| p.0.hash).hash(&mut hasher);
    value.hash(&mut hasher);
    hasher.finish()
}

impl Key {
    /// Create a key from a local value and an optional parent.
    #[must_use]
    pub fn new(value: impl Into<Scalar>, parent: Option<Key>) -> Self {
        let value = value.into();
        let hash = combine_hash(parent.as_ref(), &value);
        let depth = parent.as_ref().map_or(1, |p| p.depth() + 1);
        Self(Arc::new(KeyNode {
            value,
            parent,
            hash,
            depth,
        }))
    }

    /// Create a root key (no parent).
    #[must_use]
    pub fn root(value: impl Into<Scalar>) -> Self {
        Self::new(value, None)
    }

    /// Create a child key beneath this one.
    #[must_use]
    pub fn child(&self, value: impl Into<Scalar>) -> Self {
        Self::new(value, Some(self.clone()))
    }

    /// Graft the whole chain of `other` beneath this key.
    #[must_use]
    pub fn join(&self, other: &Key) -> Self {
        other
            .chain()
            .into_iter()
            .fold(self.clone(), |acc, value| acc.child(value.clone()))
    }

    /// Build a key from a root-to-leaf sequence of values.
    ///
    /// Returns `None` for an empty sequence.
    pub fn from_chain<I, V>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        values.into_iter().fold(None, |parent, value| {
            Some(Self::new(value, parent))
        })
    }

    /// The local value of this link.
    #[must_use]
    pub fn value(&self) -> &Scalar {
        &self.0.value
    }

    /// The parent key, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Key> {
        self.0.parent.as_ref()
    }

    /// Number of links in the chain (a root key has depth 1).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.depth
    }

    /// The cached structural hash.
    #[must_use]
    pub fn structural_hash(&self) -> u64 {
        self.0.hash
    }

    /// Values of the chain in root-to-leaf order.
    #[must_use]
    pub fn chain(&self) -> Vec<&Scalar> {
        let mut values = Vec::with_capacity(self.depth());
        let mut current = Some(self);
        while let Some(key) = current {
            values.push(key.value());
            current = key.parent();
        }
        values.reverse();
        values
    }
}

// Comparison and drop walk the parent chain in a loop, so chain depth is
// bounded only by memory.

impl Drop for KeyNode {
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(Key(node)) = next {
            match Arc::try_unwrap(node) {
                Ok(mut node) => next = node.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        let (mut a, mut b) = (self, other);
        loop {
            if Arc::ptr_eq(&a.0, &b.0) {
                return true;
            }
            if a.0.hash != b.0.hash || a.0.depth != b.0.depth || a.0.value != b.0.value {
                return false;
            }
            match (a.parent(), b.parent()) {
                (Some(pa), Some(pb)) => {
                    a = pa;
                    b = pb;
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }
        // Parent first, then value: a shorter chain sorts first, equal depths
        // compare root to leaf.
        self.depth().cmp(&other.depth()).then_with(|| {
            self.chain()
                .into_iter()
                .zip(other.chain())
                .map(|(a, b)| a.cmp(b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        })
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.chain().into_iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

// =============================================================================
// KEY DERIVATION
// =============================================================================

/// Derivation of a structural key from an identity value.
///
/// Returns `None` when no key can be derived (for example an unset
/// optional identity).
pub trait ToKey {
    fn to_key(&self) -> Option<Key>;
}

macro_rules! signed_to_key {
    ($($t:ty),*) => {
        $(impl ToKey for $t {
            fn to_key(&self) -> Option<Key> {
                Some(Key::root(Scalar::Int(*self as i64)))
            }
        })*
    };
}

macro_rules! unsigned_to_key {
    ($($t:ty),*) => {
        $(impl ToKey for $t {
            fn to_key(&self) -> Option<Key> {
                Some(Key::root(Scalar::UInt(*self as u64)))
            }
        })*
    };
}

signed_to_key!(i8, i16, i32, i64, isize);
unsigned_to_key!(u8, u16, u32, u64, usize);

impl ToKey for bool {
    fn to_key(&self) -> Option<Key> {
        Some(Key::root(Scalar::Bool(*self)))
    }
}

impl ToKey for str {
    fn to_key(&self) -> Option<Key> {
        Some(Key::root(Scalar::text(self)))
    }
}

impl ToKey for String {
    fn to_key(&self) -> Option<Key> {
        self.as_str().to_key()
    }
}

impl ToKey for Key {
    fn to_key(&self) -> Option<Key> {
        Some(self.clone())
    }
}

impl<T: ToKey + ?Sized> ToKey for &T {
    fn to_key(&self) -> Option<Key> {
        (**self).to_key()
    }
}

impl<T: ToKey> ToKey for Option<T> {
    fn to_key(&self) -> Option<Key> {
        self.as_ref()?.to_key()
    }
}

impl<A: ToKey, B: ToKey> ToKey for (A, B) {
    fn to_key(&self) -> Option<Key> {
        Some(self.0.to_key()?.join(&self.1.to_key()?))
    }
}

impl<A: ToKey, B: ToKey, C: ToKey> ToKey for (A, B, C) {
    fn to_key(&self) -> Option<Key> {
        Some(
            self.0
                .to_key()?
                .join(&self.1.to_key()?)
                .join(&self.2.to_key()?),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
