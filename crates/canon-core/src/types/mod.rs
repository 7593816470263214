//! # Core Type Definitions
//!
//! This module contains the leaf types shared by every engine component:
//! - Tagged scalar values (`Scalar`) used by keys and parameter bags
//! - Error types (`CanonError`)
//!
//! ## Comparison Guarantees
//!
//! `Scalar` implements `Ord` and `Hash` structurally. The variant tag takes
//! part in both, so `Int(1)` and `UInt(1)` are distinct values.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// SCALAR
// =============================================================================

/// A tagged scalar value.
///
/// Scalars are the building blocks of hierarchical keys and of query
/// parameter bags. `Empty` doubles as the value half of the sentinel frame
/// terminating an encoded stream.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Scalar {
    /// Absence of a value.
    Empty,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// UTF-8 text.
    Text(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
}

impl Scalar {
    /// Create a text scalar.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Check if this is the `Empty` scalar.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Get the value as a signed integer, converting unsigned values that fit.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get the value as an unsigned integer, converting non-negative signed values.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Get the value as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a boolean.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("()"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}u"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Scalar {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Scalar {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for Scalar {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Canon engine.
///
/// - Cache misses and empty query results are NOT errors
/// - Every failing operation leaves cache and entity state unchanged
/// - The engine never panics; all errors are recoverable
#[derive(Debug, Error)]
pub enum CanonError {
    /// An entity was asked to update itself from a source it cannot accept.
    #[error("Incompatible update source: expected {expected}, found {found}")]
    IncompatibleSource { expected: String, found: String },

    /// The structural key of an entity could not be derived.
    #[error("Key unavailable: {0}")]
    KeyUnavailable(String),

    /// An argument was rejected at the API boundary.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Configuration could not be parsed or validated.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_tags_are_distinct() {
        assert_ne!(Scalar::Int(1), Scalar::UInt(1));
        assert_ne!(Scalar::text("1"), Scalar::Int(1));
    }

    #[test]
    fn scalar_numeric_conversions() {
        assert_eq!(Scalar::UInt(7).as_i64(), Some(7));
        assert_eq!(Scalar::Int(-1).as_u64(), None);
        assert_eq!(Scalar::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Scalar::text("x").as_i64(), None);
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::Int(-3).to_string(), "-3");
        assert_eq!(Scalar::UInt(3).to_string(), "3u");
        assert_eq!(Scalar::text("a").to_string(), "\"a\"");
        assert_eq!(Scalar::Bytes(vec![0xab, 0x01]).to_string(), "0xab01");
    }

    #[test]
    fn error_messages() {
        let err = CanonError::IncompatibleSource {
            expected: "1".to_string(),
            found: "2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Incompatible update source: expected 1, found 2"
        );
    }
}
