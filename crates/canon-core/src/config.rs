//! # Cache Configuration
//!
//! Serde-backed settings for an [`EntityCache`](crate::EntityCache).
//! The app layer reads them from the `[cache]` table of `canon.toml`.

use crate::primitives::DEFAULT_CLEANUP_INTERVAL;
use crate::CanonError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime settings of an entity cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Milliseconds between two automatic sweeps.
    pub cleanup_interval_ms: u64,
    /// Whether timer ticks run a sweep.
    pub cleanup_enabled: bool,
    /// Whether a query miss may be answered by filtering a broader cached query.
    pub query_conversion: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_ms: duration_millis(DEFAULT_CLEANUP_INTERVAL),
            cleanup_enabled: true,
            query_conversion: true,
        }
    }
}

impl CacheConfig {
    /// The sweep interval as a `Duration`.
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    /// Reject settings the cache cannot run with.
    pub fn validate(&self) -> Result<(), CanonError> {
        validate_interval(self.cleanup_interval())
    }
}

/// Whole milliseconds of `interval`, saturating at `u64::MAX`.
pub(crate) fn duration_millis(interval: Duration) -> u64 {
    u64::try_from(interval.as_millis()).unwrap_or(u64::MAX)
}

/// Reject a zero interval, or one with a sub-millisecond remainder that the
/// stored configuration could not represent.
pub(crate) fn validate_interval(interval: Duration) -> Result<(), CanonError> {
    if interval.is_zero() {
        return Err(CanonError::InvalidArgument(
            "cleanup interval must be greater than zero".to_string(),
        ));
    }
    if interval.subsec_nanos() % 1_000_000 != 0 {
        return Err(CanonError::InvalidArgument(format!(
            "cleanup interval {:?} is not a whole number of milliseconds",
            interval
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.cleanup_interval(), Duration::from_secs(600));
        assert!(config.cleanup_enabled);
        assert!(config.query_conversion);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn interval_kept_at_millisecond_precision() {
        let config = CacheConfig {
            cleanup_interval_ms: 1500,
            ..CacheConfig::default()
        };
        assert_eq!(config.cleanup_interval(), Duration::from_millis(1500));
        assert_eq!(duration_millis(Duration::from_millis(500)), 500);
        assert!(validate_interval(Duration::from_micros(1500)).is_err());
    }

    #[test]
    fn zero_interval_rejected() {
        let config = CacheConfig {
            cleanup_interval_ms: 0,
            ..CacheConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(CanonError::InvalidArgument(_))
        ));
    }
}
