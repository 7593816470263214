//! # Merge Engine
//!
//! Three-way reconciliation of an existing ordered sequence with an incoming
//! snapshot, keyed by identity.
//!
//! - Identity in both: updated in place under `UPDATE_EXISTING`
//! - Identity only in incoming: a clone is inserted under `ADD_NEW`
//! - Identity only in existing: removed under `REMOVE_OLD`
//!
//! `None` slots are empty placeholders. They pair with each other in order
//! (the k-th existing placeholder with the k-th incoming one) and are never
//! paired with a real identity. Unpaired placeholders are added or removed
//! under the same flags as unpaired identities.
//!
//! Inserted items are placed after the last retained item whose incoming
//! counterpart precedes them, so new items follow the incoming order while
//! retained items keep their relative order.

use crate::entity::{EntityState, Shared};
use crate::CanonError;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

bitflags::bitflags! {
    /// Merge policy flags. Any combination is valid, including none.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MergePolicy: u8 {
        /// Insert items only present in the incoming sequence.
        const ADD_NEW = 1 << 0;
        /// Remove items absent from the incoming sequence.
        const REMOVE_OLD = 1 << 1;
        /// Update items present in both sequences.
        const UPDATE_EXISTING = 1 << 2;
    }
}

impl MergePolicy {
    /// Parse a comma-separated flag list.
    ///
    /// Accepts `add`, `remove`, `update`, `all` and `none` (case-insensitive).
    pub fn parse(s: &str) -> Result<Self, CanonError> {
        let mut policy = Self::empty();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            policy |= match part.to_lowercase().as_str() {
                "add" | "add_new" => Self::ADD_NEW,
                "remove" | "remove_old" => Self::REMOVE_OLD,
                "update" | "update_existing" => Self::UPDATE_EXISTING,
                "all" => Self::all(),
                "none" => Self::empty(),
                other => {
                    return Err(CanonError::InvalidArgument(format!(
                        "unknown merge flag '{}'",
                        other
                    )));
                }
            };
        }
        Ok(policy)
    }
}

/// Outcome of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MergeReport {
    pub added: usize,
    pub removed: usize,
    pub updated: usize,
}

impl MergeReport {
    /// Whether any change was applied.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.added + self.removed + self.updated > 0
    }

    /// Whether nothing was applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.has_changes()
    }
}

// =============================================================================
// MERGE ITEM
// =============================================================================

/// Items the merge engine can reconcile.
pub trait MergeItem {
    type Id: Eq + Hash + Clone;

    /// Identity used for pairing.
    fn merge_id(&self) -> Self::Id;

    /// Whether `source` may update this item.
    fn merge_compatible(&self, source: &Self) -> bool;

    /// Update in place from `source`. Returns whether anything changed.
    fn merge_update(&mut self, source: &Self) -> Result<bool, CanonError>;

    /// The copy inserted for a new incoming item.
    fn merge_clone(&self) -> Self;
}

impl<S: EntityState> MergeItem for Shared<S> {
    type Id = S::Id;

    fn merge_id(&self) -> S::Id {
        self.id()
    }

    fn merge_compatible(&self, source: &Self) -> bool {
        if Arc::ptr_eq(self, source) {
            return true;
        }
        let source = source.snapshot();
        self.read(|state| state.is_compatible(&source))
    }

    fn merge_update(&mut self, source: &Self) -> Result<bool, CanonError> {
        self.update(source)
    }

    fn merge_clone(&self) -> Self {
        Arc::new(self.clone_entity(true))
    }
}

// =============================================================================
// MERGE
// =============================================================================

/// Reconcile `existing` with `incoming` under `policy`.
///
/// Compatibility of every paired item is checked before anything is
/// mutated; an incompatible pair fails the whole merge and leaves
/// `existing` untouched. Later duplicates of an identity in `incoming` are
/// ignored, and so are later duplicates in `existing` (which `REMOVE_OLD`
/// drops).
pub fn merge<T: MergeItem>(
    existing: &mut Vec<Option<T>>,
    incoming: &[Option<T>],
    policy: MergePolicy,
) -> Result<MergeReport, CanonError> {
    let mut report = MergeReport::default();
    if policy.is_empty() {
        return Ok(report);
    }

    let mut incoming_index: HashMap<T::Id, usize> = HashMap::new();
    let mut incoming_nulls = Vec::new();
    for (slot, item) in incoming.iter().enumerate() {
        match item {
            Some(item) => {
                incoming_index.entry(item.merge_id()).or_insert(slot);
            }
            None => incoming_nulls.push(slot),
        }
    }

    // tokens[i] = incoming slot paired with existing[i]
    let mut seen = HashSet::new();
    let mut nulls = incoming_nulls.into_iter();
    let mut tokens: Vec<Option<usize>> = existing
        .iter()
        .map(|item| match item {
            Some(item) => {
                let id = item.merge_id();
                if seen.insert(id.clone()) {
                    incoming_index.get(&id).copied()
                } else {
                    None
                }
            }
            None => nulls.next(),
        })
        .collect();
    let paired: HashSet<usize> = tokens.iter().flatten().copied().collect();

    if policy.contains(MergePolicy::UPDATE_EXISTING) {
        for (item, token) in existing.iter().zip(&tokens) {
            if let (Some(item), Some(Some(source))) = (item, token.map(|t| &incoming[t])) {
                if !item.merge_compatible(source) {
                    return Err(CanonError::IncompatibleSource {
                        expected: "compatible source for paired identity".to_string(),
                        found: format!("incompatible item at incoming slot {}", token.unwrap_or_default()),
                    });
                }
            }
        }
        for (item, token) in existing.iter_mut().zip(&tokens) {
            if let (Some(item), Some(Some(source))) = (item.as_mut(), token.map(|t| &incoming[t])) {
                if item.merge_update(source)? {
                    report.updated += 1;
                }
            }
        }
    }

    if policy.contains(MergePolicy::REMOVE_OLD) {
        let before = existing.len();
        let (kept, kept_tokens): (Vec<_>, Vec<_>) = existing
            .drain(..)
            .zip(tokens)
            .filter(|(_, token)| token.is_some())
            .unzip();
        *existing = kept;
        tokens = kept_tokens;
        report.removed = before - existing.len();
    }

    if policy.contains(MergePolicy::ADD_NEW) {
        for (slot, item) in incoming.iter().enumerate() {
            if paired.contains(&slot) {
                continue;
            }
            if let Some(item) = item {
                if incoming_index.get(&item.merge_id()) != Some(&slot) {
                    continue;
                }
            }
            let position = tokens
                .iter()
                .rposition(|token| token.is_some_and(|t| t < slot))
                .map_or(0, |p| p + 1);
            existing.insert(position, item.as_ref().map(MergeItem::merge_clone));
            tokens.insert(position, Some(slot));
            report.added += 1;
        }
    }

    Ok(report)
}

// =============================================================================
// TESTS
// =============================================================================
