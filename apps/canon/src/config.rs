//! # Application Configuration
//!
//! Settings read from `canon.toml`:
//!
//! ```toml
//! [cache]
//! cleanup_interval_ms = 600000
//! cleanup_enabled = true
//! query_conversion = true
//!
//! [replay]
//! policy = "add,remove,update"
//! ```
//!
//! Every table and field is optional. A missing file yields the defaults.

use canon_core::{CacheConfig, CanonError, MergePolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "canon.toml";

/// Maximum configuration file size (64 KB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// The `[replay]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Comma-separated merge flags (`add`, `remove`, `update`, `all`, `none`).
    pub policy: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            policy: "all".to_string(),
        }
    }
}

impl ReplayConfig {
    /// The parsed merge policy.
    pub fn merge_policy(&self) -> Result<MergePolicy, CanonError> {
        MergePolicy::parse(&self.policy)
            .map_err(|e| CanonError::ConfigError(format!("[replay] policy: {}", e)))
    }
}

/// Whole-file configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub replay: ReplayConfig,
}

impl AppConfig {
    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, CanonError> {
        let config: Self =
            toml::from_str(text).map_err(|e| CanonError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CanonError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let metadata = std::fs::metadata(path)
            .map_err(|e| CanonError::IoError(format!("Cannot read config metadata: {}", e)))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(CanonError::ConfigError(format!(
                "Config file size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path)
            .map_err(|e| CanonError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;
        let config = Self::from_toml(&text)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Reject settings the cache or the replay cannot run with.
    pub fn validate(&self) -> Result<(), CanonError> {
        self.cache
            .validate()
            .map_err(|e| CanonError::ConfigError(format!("[cache] {}", e)))?;
        self.replay.merge_policy()?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let config = AppConfig::from_toml("").expect("parse");
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.replay.merge_policy().expect("policy"),
            MergePolicy::all()
        );
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = AppConfig::from_toml(
            "[cache]\ncleanup_interval_ms = 30000\n\n[replay]\npolicy = \"add,update\"\n",
        )
        .expect("parse");

        assert_eq!(config.cache.cleanup_interval_ms, 30000);
        assert!(config.cache.query_conversion);
        assert_eq!(
            config.replay.merge_policy().expect("policy"),
            MergePolicy::ADD_NEW | MergePolicy::UPDATE_EXISTING
        );
    }

    #[test]
    fn zero_interval_rejected() {
        let result = AppConfig::from_toml("[cache]\ncleanup_interval_ms = 0\n");
        assert!(matches!(result, Err(CanonError::ConfigError(_))));
    }

    #[test]
    fn unknown_policy_rejected() {
        let result = AppConfig::from_toml("[replay]\npolicy = \"merge\"\n");
        assert!(matches!(result, Err(CanonError::ConfigError(_))));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(AppConfig::from_toml("[cache\n").is_err());
    }
}
