//! # Query Module
//!
//! Structurally comparable request descriptors.
//!
//! - A query is a method name plus a case-insensitive parameter bag
//! - Equality, ordering and hashing are structural over (method, params)
//! - An optional match predicate decides membership of single entities
//! - `can_satisfy` lets a broader cached result answer a narrower query

use crate::entity::EntityState;
use crate::primitives::{MAX_METHOD_LENGTH, MAX_PARAM_NAME_LENGTH, MAX_PARAMS};
use crate::{CanonError, Scalar};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// =============================================================================
// QUERY CONTRACT
// =============================================================================

/// Contract the query cache requires of its query type.
///
/// `Clone` stands in for the query clone owned by each cache entry.
pub trait QuerySpec<S: EntityState>: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    /// The method name.
    fn method(&self) -> &str;

    /// The parameter bag.
    fn params(&self) -> &Params;

    /// Whether [`QuerySpec::matches`] is meaningful for this query.
    fn supports_match(&self) -> bool {
        false
    }

    /// Whether a single entity belongs to this query's result.
    fn matches(&self, state: &S) -> bool {
        let _ = state;
        false
    }

    /// Whether this query's result contains everything `other` needs, so
    /// that filtering it through `other` yields `other`'s result.
    fn can_satisfy(&self, other: &Self) -> bool {
        let _ = other;
        false
    }
}

// =============================================================================
// PARAMETER BAG
// =============================================================================

/// Case-insensitive name → scalar mapping.
///
/// Names are compared case-insensitively but keep their original spelling
/// for display and encoding. Iteration follows the folded-name order.
#[derive(Clone, Default)]
pub struct Params {
    /// folded name -> (original name, value)
    entries: BTreeMap<String, (String, Scalar)>,
}

impl Params {
    /// Create an empty parameter bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing any value under the same folded name.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> Result<Option<Scalar>, CanonError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CanonError::InvalidArgument(
                "parameter name must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_PARAM_NAME_LENGTH {
            return Err(CanonError::InvalidArgument(format!(
                "parameter name exceeds {} bytes",
                MAX_PARAM_NAME_LENGTH
            )));
        }
        let folded = name.to_lowercase();
        if !self.entries.contains_key(&folded) && self.entries.len() >= MAX_PARAMS {
            return Err(CanonError::InvalidArgument(format!(
                "parameter bag exceeds {} entries",
                MAX_PARAMS
            )));
        }
        Ok(self
            .entries
            .insert(folded, (name, value.into()))
            .map(|(_, previous)| previous))
    }

    /// Look up a parameter by name, ignoring case.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.entries.get(&name.to_lowercase()).map(|(_, v)| v)
    }

    /// Whether a parameter exists, ignoring case.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bag is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate (original name, value) pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.values().map(|(n, v)| (n.as_str(), v))
    }

    /// Whether every parameter of `self` appears in `other` with an equal value.
    #[must_use]
    pub fn is_subset_of(&self, other: &Params) -> bool {
        self.entries
            .iter()
            .all(|(folded, (_, value))| other.entries.get(folded).is_some_and(|(_, v)| v == value))
    }

    fn canonical(&self) -> impl Iterator<Item = (&String, &Scalar)> {
        self.entries.iter().map(|(folded, (_, v))| (folded, v))
    }
}

impl PartialEq for Params {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.canonical().eq(other.canonical())
    }
}

impl Eq for Params {}

impl Hash for Params {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        for (folded, value) in self.canonical() {
            folded.hash(state);
            value.hash(state);
        }
    }
}

impl PartialOrd for Params {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Params {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(other.canonical())
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// QUERY
// =============================================================================

/// Match predicate over an entity state and the query's own parameters.
pub type Matcher<S> = Arc<dyn Fn(&S, &Params) -> bool + Send + Sync>;

/// The provided [`QuerySpec`] implementation.
///
/// Structural identity is (method, params); the matcher does not take part
/// in equality. A query without a matcher does not support matching.
pub struct Query<S: EntityState> {
    method: String,
    params: Params,
    matcher: Option<Matcher<S>>,
}

impl<S: EntityState> Query<S> {
    /// Create a query with an empty parameter bag.
    pub fn new(method: impl Into<String>) -> Result<Self, CanonError> {
        let method = method.into();
        if method.is_empty() {
            return Err(CanonError::InvalidArgument(
                "query method must not be empty".to_string(),
            ));
        }
        if method.len() > MAX_METHOD_LENGTH {
            return Err(CanonError::InvalidArgument(format!(
                "query method exceeds {} bytes",
                MAX_METHOD_LENGTH
            )));
        }
        Ok(Self {
            method,
            params: Params::new(),
            matcher: None,
        })
    }

    /// Create a query from a method and an existing parameter bag.
    pub fn with_params(method: impl Into<String>, params: Params) -> Result<Self, CanonError> {
        let mut query = Self::new(method)?;
        query.params = params;
        Ok(query)
    }

    /// Add a parameter.
    pub fn param(
        mut self,
        name: impl Into<String>,
        value: impl Into<Scalar>,
    ) -> Result<Self, CanonError> {
        self.params.insert(name, value)?;
        Ok(self)
    }

    /// Attach a match predicate.
    #[must_use]
    pub fn matching(mut self, matcher: impl Fn(&S, &Params) -> bool + Send + Sync + 'static) -> Self {
        self.matcher = Some(Arc::new(matcher));
        self
    }
}

impl<S: EntityState> QuerySpec<S> for Query<S> {
    fn method(&self) -> &str {
        &self.method
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn supports_match(&self) -> bool {
        self.matcher.is_some()
    }

    fn matches(&self, state: &S) -> bool {
        self.matcher
            .as_ref()
            .is_some_and(|matcher| matcher(state, &self.params))
    }

    /// A query satisfies a strictly narrower query of the same method:
    /// every one of its parameters must appear, with the same value, in
    /// `other`.
    fn can_satisfy(&self, other: &Self) -> bool {
        self.method == other.method
            && self.params.len() < other.params.len()
            && self.params.is_subset_of(&other.params)
    }
}

impl<S: EntityState> Clone for Query<S> {
    fn clone(&self) -> Self {
        Self {
            method: self.method.clone(),
            params: self.params.clone(),
            matcher: self.matcher.clone(),
        }
    }
}

impl<S: EntityState> PartialEq for Query<S> {
    fn eq(&self, other: &Self) -> bool {
        self.method == other.method && self.params == other.params
    }
}

impl<S: EntityState> Eq for Query<S> {}

impl<S: EntityState> Hash for Query<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.method.hash(state);
        self.params.hash(state);
    }
}

impl<S: EntityState> PartialOrd for Query<S> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<S: EntityState> Ord for Query<S> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.method
            .cmp(&other.method)
            .then_with(|| self.params.cmp(&other.params))
    }
}

impl<S: EntityState> fmt::Debug for Query<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("method", &self.method)
            .field("params", &self.params)
            .field("matcher", &self.matcher.is_some())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
