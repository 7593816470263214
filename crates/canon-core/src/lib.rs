//! # canon-core
//!
//! The identity-preserving object cache for Canon - THE ENGINE.
//!
//! Applications that repeatedly receive fresh snapshots of remote data push
//! them through this crate and get back canonical, identity-stable
//! instances. Observers bound to an instance see it updated in place instead
//! of being handed a replacement.
//!
//! ## Components
//!
//! - `key` → hierarchical structural identity (`Key`)
//! - `entity` → versioned mutable entities with clone/update protocol
//! - `query` → structurally comparable query descriptors
//! - `merge` → three-way collection reconciliation
//! - `cache` → weak-referenced object cache + cookie-tracked query cache
//! - `sweeper` → periodic cache maintenance
//! - `formats` → binary encoding of keys and parameter bags
//!
//! ## Architectural Constraints
//!
//! - No async, no network, no disk I/O
//! - Every operation is synchronous, bounded and in-memory
//! - Weak references are the only reclamation mechanism

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod config;
pub mod container;
pub mod entity;
pub mod formats;
pub mod key;
pub mod merge;
pub mod primitives;
pub mod query;
pub mod sweeper;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CanonError, Scalar};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use cache::{CacheStats, CachedQuery, Cookie, EntityCache, MatchResponse, SweepReport};
pub use config::CacheConfig;
pub use container::{EntityContainer, EntitySet};
pub use entity::{Entity, EntityState, Identity, ObserverId, Shared, UpdateScope};
pub use key::{Key, ToKey};
pub use merge::{MergeItem, MergePolicy, MergeReport, merge};
pub use query::{Matcher, Params, Query, QuerySpec};
pub use sweeper::{Sweepable, Sweeper};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{FormatHeader, key_from_bytes, key_to_bytes, params_from_bytes, params_to_bytes};
