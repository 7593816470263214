//! Integration tests for configuration loading and snapshot replay.

use canon::cli::{cmd_config, cmd_replay, replay};
use canon::config::AppConfig;
use canon::record::load_snapshot;
use canon_core::{CanonError, MergePolicy};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).expect("write file");
    path
}

// =============================================================================
// CONFIG FILE TESTS
// =============================================================================

#[test]
fn missing_config_file_gives_defaults() {
    let dir = TempDir::new().expect("temp dir");
    let config = AppConfig::load(&dir.path().join("canon.toml")).expect("load");
    assert_eq!(config, AppConfig::default());
}

#[test]
fn config_file_is_read() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(
        &dir,
        "canon.toml",
        "[cache]\ncleanup_enabled = false\n\n[replay]\npolicy = \"update\"\n",
    );

    let config = AppConfig::load(&path).expect("load");

    assert!(!config.cache.cleanup_enabled);
    assert_eq!(config.cache.cleanup_interval_ms, 600_000);
    assert_eq!(
        config.replay.merge_policy().expect("policy"),
        MergePolicy::UPDATE_EXISTING
    );
    cmd_config(&config, &path, true).expect("print config");
}

#[test]
fn invalid_config_file_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(&dir, "canon.toml", "[cache]\ncleanup_interval_ms = \"soon\"\n");

    assert!(matches!(
        AppConfig::load(&path),
        Err(CanonError::ConfigError(_))
    ));
}

// =============================================================================
// REPLAY TESTS
// =============================================================================

#[test]
fn replay_from_files() {
    let dir = TempDir::new().expect("temp dir");
    let first = write(
        &dir,
        "s1.json",
        r#"[{"id": 1, "team": "red"}, null, {"id": 2, "team": "blue"}]"#,
    );
    let second = write(
        &dir,
        "s2.json",
        r#"[{"id": 1, "team": "blue"}, null, {"id": 3, "team": "blue"}]"#,
    );

    let snapshots = vec![
        ("s1".to_string(), load_snapshot(&first).expect("load")),
        ("s2".to_string(), load_snapshot(&second).expect("load")),
    ];
    let summary = replay(
        &AppConfig::default().cache,
        snapshots,
        MergePolicy::all(),
        &["team=blue".to_string()],
    )
    .expect("replay");

    let last = summary.snapshots.last().expect("two snapshots");
    assert_eq!(
        (last.report.added, last.report.removed, last.report.updated),
        (1, 1, 1)
    );
    assert_eq!(last.view_size, 3);

    let ids: Vec<u64> = summary.instances.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(summary.instances[0].version, 1);
    assert_eq!(summary.query_size, Some(2));
    assert_eq!(summary.stats.live_objects, 2);

    cmd_replay(
        &AppConfig::default(),
        &[first, second],
        Some("add,remove,update"),
        &[],
        true,
    )
    .expect("cmd replay");
}

#[test]
fn replay_rejects_unknown_policy() {
    let dir = TempDir::new().expect("temp dir");
    let path = write(&dir, "s.json", "[]");

    let result = cmd_replay(&AppConfig::default(), &[path], Some("sideways"), &[], true);

    assert!(matches!(result, Err(CanonError::InvalidArgument(_))));
}

#[test]
fn replay_rejects_missing_file() {
    let dir = TempDir::new().expect("temp dir");
    let result = cmd_replay(
        &AppConfig::default(),
        &[dir.path().join("absent.json")],
        None,
        &[],
        true,
    );

    assert!(matches!(result, Err(CanonError::IoError(_))));
}
