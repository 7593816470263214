//! # Engine Primitives
//!
//! Hardcoded runtime constants for the Canon engine.
//!
//! These values are compiled into the binary. Configuration may override the
//! cleanup schedule at runtime, but never the encoding limits.

use std::time::Duration;

/// Default interval between two automatic sweeps.
///
/// - Ten minutes, matching the reference cleanup timer.
/// - Reconfigurable through `CacheConfig::cleanup_interval_ms`.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(600);

/// Magic bytes for the Canon binary key/parameter format header.
///
/// - Header = Magic Bytes ("CANK") + Version (u8) before the frame stream.
pub const MAGIC_BYTES: &[u8; 4] = b"CANK";

/// Current encoding format version.
///
/// Increment this when making breaking changes to the frame layout.
pub const FORMAT_VERSION: u8 = 1;

/// Frame name used for every link of an encoded key chain.
pub const KEY_FRAME_NAME: &str = "k";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for a query method name.
pub const MAX_METHOD_LENGTH: usize = 256;

/// Maximum length for a parameter name.
pub const MAX_PARAM_NAME_LENGTH: usize = 256;

/// Maximum number of parameters in a single parameter bag.
pub const MAX_PARAMS: usize = 1024;

/// Maximum depth of a key chain accepted by the decoder.
///
/// Prevents unbounded allocation from malformed streams.
pub const MAX_KEY_DEPTH: usize = 256;

/// Maximum size of an encoded key or parameter bag (1 MB).
pub const MAX_ENCODED_SIZE: usize = 1024 * 1024;
