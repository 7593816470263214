//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::AppConfig;
use crate::record::{Record, load_snapshot, parse_scalar};
use canon_core::{
    CacheConfig, CacheStats, CanonError, Cookie, Entity, EntityCache, EntityContainer, EntitySet,
    MergePolicy, MergeReport, Query, QuerySpec, Shared, SweepReport,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Method name of the query tracked by `replay --query`.
const REPLAY_QUERY_METHOD: &str = "records";

// =============================================================================
// REPLAY
// =============================================================================

/// Merge outcome of one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotOutcome {
    pub source: String,
    pub slots: usize,
    #[serde(flatten)]
    pub report: MergeReport,
    pub view_size: usize,
}

/// A canonical instance at the end of a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InstanceVersion {
    pub id: u64,
    pub version: u64,
}

/// Everything a replay reports.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub policy: String,
    pub snapshots: Vec<SnapshotOutcome>,
    pub instances: Vec<InstanceVersion>,
    pub query_size: Option<usize>,
    pub sweep: Option<SweepReport>,
    pub stats: CacheStats,
}

/// Lower-case flag names of a policy, or `none`.
pub fn policy_label(policy: MergePolicy) -> String {
    if policy.is_empty() {
        return "none".to_string();
    }
    let names: Vec<String> = policy
        .iter_names()
        .map(|(name, _)| match name {
            "ADD_NEW" => "add".to_string(),
            "REMOVE_OLD" => "remove".to_string(),
            "UPDATE_EXISTING" => "update".to_string(),
            other => other.to_lowercase(),
        })
        .collect();
    names.join(",")
}

/// Build the tracked query from `name=value` filters. No filters, no query.
pub fn build_query(filters: &[String]) -> Result<Option<Query<Record>>, CanonError> {
    if filters.is_empty() {
        return Ok(None);
    }
    let mut query = Query::<Record>::new(REPLAY_QUERY_METHOD)?;
    for filter in filters {
        let (name, value) = filter.split_once('=').ok_or_else(|| {
            CanonError::InvalidArgument(format!("query filter '{}' is not name=value", filter))
        })?;
        query = query.param(name.trim(), parse_scalar(value.trim()))?;
    }
    Ok(Some(query.matching(|record, params| {
        params
            .iter()
            .all(|(name, value)| record.scalar(name).as_ref() == Some(value))
    })))
}

fn live_ids(view: &[Option<Shared<Record>>]) -> BTreeSet<u64> {
    view.iter().flatten().map(|entity| entity.id()).collect()
}

/// Replay parsed snapshots, in order, into a fresh cache.
///
/// Identities that leave the view are uncached so that a tracked query only
/// counts records still present.
pub fn replay(
    cache_config: &CacheConfig,
    snapshots: Vec<(String, Vec<Option<Record>>)>,
    policy: MergePolicy,
    filters: &[String],
) -> Result<ReplaySummary, CanonError> {
    let cache: EntityCache<Record> = EntityCache::new(cache_config.clone())?;
    let query = build_query(filters)?;
    let cookie = Cookie::new();
    if let Some(query) = &query {
        cache.add_cached_query(query, EntitySet::new(), Some(&cookie));
        tracing::debug!(params = query.params().len(), "tracking query");
    }

    let mut view: Vec<Option<Shared<Record>>> = Vec::new();
    let mut outcomes = Vec::with_capacity(snapshots.len());
    for (source, records) in snapshots {
        let incoming: Vec<Option<Shared<Record>>> = records
            .into_iter()
            .map(|slot| slot.map(Entity::shared))
            .collect();

        let before = live_ids(&view);
        let report = cache.merge_collection(&mut view, &incoming, policy)?;
        for gone in before.difference(&live_ids(&view)) {
            cache.uncache_object(gone);
        }

        tracing::info!(
            source = %source,
            added = report.added,
            removed = report.removed,
            updated = report.updated,
            "snapshot merged"
        );
        outcomes.push(SnapshotOutcome {
            source,
            slots: incoming.len(),
            report,
            view_size: view.len(),
        });
    }

    let instances = view
        .iter()
        .flatten()
        .map(|entity| InstanceVersion {
            id: entity.id(),
            version: entity.version(),
        })
        .collect();
    let query_size = query
        .as_ref()
        .and_then(|q| cache.get_cached_query(q))
        .map(|result| result.len());
    let sweep = cache.sweep();
    let stats = cache.stats();

    if let Some(query) = &query {
        cache.release_cached_query(query, &cookie);
    }

    Ok(ReplaySummary {
        policy: policy_label(policy),
        snapshots: outcomes,
        instances,
        query_size,
        sweep,
        stats,
    })
}

/// Load snapshot files and replay them.
pub fn cmd_replay(
    config: &AppConfig,
    paths: &[PathBuf],
    policy: Option<&str>,
    filters: &[String],
    json_mode: bool,
) -> Result<(), CanonError> {
    let policy = match policy {
        Some(flags) => MergePolicy::parse(flags)?,
        None => config.replay.merge_policy()?,
    };

    let mut snapshots = Vec::with_capacity(paths.len());
    for path in paths {
        snapshots.push((path.display().to_string(), load_snapshot(path)?));
    }

    let summary = replay(&config.cache, snapshots, policy, filters)?;

    if json_mode {
        let output = serde_json::to_string_pretty(&summary)
            .map_err(|e| CanonError::SerializationError(e.to_string()))?;
        println!("{}", output);
        return Ok(());
    }

    println!("Canon Replay");
    println!("============");
    println!("Policy: {}", summary.policy);
    println!();
    for outcome in &summary.snapshots {
        println!(
            "{}: {} slots, +{} -{} ~{} -> view {}",
            outcome.source,
            outcome.slots,
            outcome.report.added,
            outcome.report.removed,
            outcome.report.updated,
            outcome.view_size
        );
    }
    println!();
    println!("Instances:");
    for instance in &summary.instances {
        println!("  id {:<8} version {}", instance.id, instance.version);
    }
    if let Some(size) = summary.query_size {
        println!();
        println!("Query result: {} record(s)", size);
    }
    if let Some(sweep) = summary.sweep {
        println!(
            "Sweep: {} object(s), {} query(ies) removed",
            sweep.objects_removed, sweep.queries_removed
        );
    }

    Ok(())
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Show the effective configuration.
pub fn cmd_config(config: &AppConfig, path: &Path, json_mode: bool) -> Result<(), CanonError> {
    if json_mode {
        let output = serde_json::json!({
            "path": path.to_string_lossy(),
            "loaded": path.exists(),
            "cache": config.cache,
            "replay": config.replay,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Canon Configuration");
    println!("===================");
    println!(
        "File:     {} ({})",
        path.display(),
        if path.exists() { "loaded" } else { "defaults" }
    );
    println!();
    println!("[cache]");
    println!("cleanup_interval_ms   = {}", config.cache.cleanup_interval_ms);
    println!("cleanup_enabled       = {}", config.cache.cleanup_enabled);
    println!("query_conversion      = {}", config.cache.query_conversion);
    println!();
    println!("[replay]");
    println!(
        "policy                = {}",
        policy_label(config.replay.merge_policy()?)
    );

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::parse_snapshot;

    fn snap(name: &str, text: &str) -> (String, Vec<Option<Record>>) {
        (name.to_string(), parse_snapshot(text).expect("snapshot"))
    }

    #[test]
    fn policy_labels() {
        assert_eq!(policy_label(MergePolicy::empty()), "none");
        assert_eq!(policy_label(MergePolicy::all()), "add,remove,update");
        assert_eq!(
            policy_label(MergePolicy::REMOVE_OLD | MergePolicy::UPDATE_EXISTING),
            "remove,update"
        );
    }

    #[test]
    fn bad_filter_rejected() {
        assert!(build_query(&["status".to_string()]).is_err());
        assert!(build_query(&[]).expect("no filters").is_none());
    }

    #[test]
    fn replay_tracks_versions_and_query() {
        let summary = replay(
            &CacheConfig::default(),
            vec![
                snap("s1", r#"[{"id": 1, "state": "open"}, {"id": 2, "state": "open"}]"#),
                snap("s2", r#"[{"id": 1, "state": "done"}, {"id": 2, "state": "open"}, null]"#),
                snap("s3", r#"[{"id": 2, "state": "open"}, null]"#),
            ],
            MergePolicy::all(),
            &["state=open".to_string()],
        )
        .expect("replay");

        let reports: Vec<(usize, usize, usize)> = summary
            .snapshots
            .iter()
            .map(|o| (o.report.added, o.report.removed, o.report.updated))
            .collect();
        assert_eq!(reports, vec![(2, 0, 0), (1, 0, 1), (0, 1, 0)]);
        assert_eq!(
            summary.instances,
            vec![InstanceVersion { id: 2, version: 0 }]
        );
        assert_eq!(summary.query_size, Some(1));
        assert_eq!(summary.policy, "add,remove,update");
    }

    #[test]
    fn add_only_replay_never_updates() {
        let summary = replay(
            &CacheConfig::default(),
            vec![
                snap("s1", r#"[{"id": 1, "v": 1}]"#),
                snap("s2", r#"[{"id": 1, "v": 2}, {"id": 2, "v": 1}]"#),
            ],
            MergePolicy::ADD_NEW,
            &[],
        )
        .expect("replay");

        assert_eq!(summary.instances.len(), 2);
        assert!(summary.instances.iter().all(|i| i.version == 0));
        assert_eq!(summary.query_size, None);
    }
}
