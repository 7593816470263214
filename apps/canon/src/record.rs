//! # Snapshot Records
//!
//! The entity type the replay tool caches, and the JSON snapshot reader.
//!
//! A snapshot is a JSON array whose elements are either objects carrying an
//! unsigned `"id"` plus arbitrary fields, or `null` for an empty slot:
//!
//! ```json
//! [{"id": 1, "name": "Ada"}, null, {"id": 2, "name": "Grace"}]
//! ```

use canon_core::{CanonError, EntityState, Scalar};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

/// Maximum snapshot file size (100 MB).
const MAX_SNAPSHOT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// One record of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: u64,
    pub fields: Map<String, Value>,
}

impl EntityState for Record {
    type Id = u64;

    fn id(&self) -> u64 {
        self.id
    }

    fn is_update_required(&self, source: &Self) -> bool {
        self.fields != source.fields
    }
}

impl Record {
    /// Build a record from one snapshot element. `null` is an empty slot.
    pub fn from_value(value: Value) -> Result<Option<Self>, CanonError> {
        let mut fields = match value {
            Value::Null => return Ok(None),
            Value::Object(fields) => fields,
            other => {
                return Err(CanonError::DeserializationError(format!(
                    "Snapshot element must be an object or null, found {}",
                    other
                )));
            }
        };
        let id = fields
            .remove("id")
            .and_then(|id| id.as_u64())
            .ok_or_else(|| {
                CanonError::DeserializationError(
                    "Snapshot record needs an unsigned integer 'id'".to_string(),
                )
            })?;
        Ok(Some(Self { id, fields }))
    }

    /// A field as a scalar, for query matching. `id` resolves to the identity.
    ///
    /// Arrays, objects and non-integral numbers have no scalar form.
    pub fn scalar(&self, name: &str) -> Option<Scalar> {
        if name.eq_ignore_ascii_case("id") {
            return Some(Scalar::UInt(self.id));
        }
        let (_, value) = self
            .fields
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))?;
        json_scalar(value)
    }
}

fn json_scalar(value: &Value) -> Option<Scalar> {
    match value {
        Value::Null => Some(Scalar::Empty),
        Value::Bool(b) => Some(Scalar::Bool(*b)),
        Value::Number(n) => n
            .as_u64()
            .map(Scalar::UInt)
            .or_else(|| n.as_i64().map(Scalar::Int)),
        Value::String(s) => Some(Scalar::Text(s.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a command-line value the way a JSON field of the same text would
/// be read: booleans, unsigned then signed integers, otherwise text.
pub fn parse_scalar(text: &str) -> Scalar {
    match text {
        "true" => Scalar::Bool(true),
        "false" => Scalar::Bool(false),
        "null" => Scalar::Empty,
        _ => text
            .parse::<u64>()
            .map(Scalar::UInt)
            .or_else(|_| text.parse::<i64>().map(Scalar::Int))
            .unwrap_or_else(|_| Scalar::Text(text.to_string())),
    }
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Parse snapshot text.
pub fn parse_snapshot(text: &str) -> Result<Vec<Option<Record>>, CanonError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| CanonError::DeserializationError(format!("Invalid snapshot JSON: {}", e)))?;
    let Value::Array(elements) = value else {
        return Err(CanonError::DeserializationError(
            "Snapshot must be a JSON array".to_string(),
        ));
    };
    elements.into_iter().map(Record::from_value).collect()
}

/// Read and parse a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Vec<Option<Record>>, CanonError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CanonError::IoError(format!("Cannot read file metadata: {}", e)))?;
    if !metadata.is_file() {
        return Err(CanonError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    if metadata.len() > MAX_SNAPSHOT_FILE_SIZE {
        return Err(CanonError::DeserializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            MAX_SNAPSHOT_FILE_SIZE
        )));
    }
    let text = std::fs::read_to_string(path)
        .map_err(|e| CanonError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;
    parse_snapshot(&text)
}

// =============================================================================
// TESTS
// =============================================================================
