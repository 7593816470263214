//! # Key and Parameter Encoding
//!
//! Binary tag/value format for keys and parameter bags.
//!
//! Format: Header (5 bytes) + frame stream.
//! - 4 bytes: Magic ("CANK")
//! - 1 byte: Version
//! - frames: postcard-encoded `(name, Scalar)` pairs
//! - sentinel: the empty pair `("", Scalar::Empty)`
//!
//! Keys are written root-to-leaf with every frame named `"k"`. Parameter
//! bags are written in canonical order under their original-case names.
//!
//! All size and shape validation happens before a key or bag is built.

use crate::key::Key;
use crate::primitives::{self, KEY_FRAME_NAME, MAX_ENCODED_SIZE, MAX_KEY_DEPTH, MAX_PARAMS};
use crate::query::Params;
use crate::{CanonError, Scalar};

/// Header size in bytes.
const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The format header preceding every frame stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl FormatHeader {
    /// Create a header with the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate magic bytes and version.
    pub fn validate(&self) -> Result<(), CanonError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(CanonError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(CanonError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CanonError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CanonError::DeserializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for FormatHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// FRAME STREAM
// =============================================================================

fn write_frames<'a>(
    frames: impl Iterator<Item = (&'a str, &'a Scalar)>,
) -> Result<Vec<u8>, CanonError> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&FormatHeader::new().to_bytes());
    for frame in frames.chain(std::iter::once(("", &Scalar::Empty))) {
        let encoded = postcard::to_stdvec(&frame)
            .map_err(|e| CanonError::SerializationError(e.to_string()))?;
        out.extend_from_slice(&encoded);
    }
    if out.len() > MAX_ENCODED_SIZE {
        return Err(CanonError::SerializationError(format!(
            "Encoded size {} bytes exceeds maximum allowed {} bytes",
            out.len(),
            MAX_ENCODED_SIZE
        )));
    }
    Ok(out)
}

fn read_frames(bytes: &[u8], max_frames: usize) -> Result<Vec<(String, Scalar)>, CanonError> {
    if bytes.len() > MAX_ENCODED_SIZE {
        return Err(CanonError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_ENCODED_SIZE
        )));
    }
    FormatHeader::from_bytes(bytes)?.validate()?;

    let mut frames = Vec::new();
    let mut rest = &bytes[HEADER_SIZE..];
    loop {
        if rest.is_empty() {
            return Err(CanonError::DeserializationError(
                "Missing sentinel frame".to_string(),
            ));
        }
        let ((name, value), remaining): ((String, Scalar), &[u8]) =
            postcard::take_from_bytes(rest).map_err(|e| {
                CanonError::DeserializationError(format!("Failed to decode frame: {}", e))
            })?;
        rest = remaining;

        if name.is_empty() {
            if !value.is_empty() {
                return Err(CanonError::DeserializationError(
                    "Unnamed frame carries a value".to_string(),
                ));
            }
            if !rest.is_empty() {
                return Err(CanonError::DeserializationError(format!(
                    "{} trailing bytes after sentinel",
                    rest.len()
                )));
            }
            return Ok(frames);
        }
        if frames.len() >= max_frames {
            return Err(CanonError::DeserializationError(format!(
                "Frame count exceeds maximum of {}",
                max_frames
            )));
        }
        frames.push((name, value));
    }
}

// =============================================================================
// KEYS
// =============================================================================

/// Encode a key (header + root-to-leaf frames + sentinel).
pub fn key_to_bytes(key: &Key) -> Result<Vec<u8>, CanonError> {
    write_frames(key.chain().into_iter().map(|value| (KEY_FRAME_NAME, value)))
}

/// Decode a key.
pub fn key_from_bytes(bytes: &[u8]) -> Result<Key, CanonError> {
    let frames = read_frames(bytes, MAX_KEY_DEPTH)?;
    if let Some((name, _)) = frames.iter().find(|(name, _)| name != KEY_FRAME_NAME) {
        return Err(CanonError::DeserializationError(format!(
            "Unexpected frame '{}' in key stream",
            name
        )));
    }
    Key::from_chain(frames.into_iter().map(|(_, value)| value))
        .ok_or_else(|| CanonError::DeserializationError("Empty key stream".to_string()))
}

// =============================================================================
// PARAMETER BAGS
// =============================================================================

/// Encode a parameter bag (header + one frame per parameter + sentinel).
pub fn params_to_bytes(params: &Params) -> Result<Vec<u8>, CanonError> {
    write_frames(params.iter())
}

/// Decode a parameter bag. Duplicate names (ignoring case) are rejected.
pub fn params_from_bytes(bytes: &[u8]) -> Result<Params, CanonError> {
    let mut params = Params::new();
    for (name, value) in read_frames(bytes, MAX_PARAMS)? {
        if params.contains(&name) {
            return Err(CanonError::DeserializationError(format!(
                "Duplicate parameter '{}'",
                name
            )));
        }
        params
            .insert(name, value)
            .map_err(|e| CanonError::DeserializationError(e.to_string()))?;
    }
    Ok(params)
}

// =============================================================================
// TESTS
// =============================================================================
