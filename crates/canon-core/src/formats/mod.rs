//! # Formats Module
//!
//! Binary encodings owned by the engine. File I/O stays in the app layer.

pub mod encoding;

pub use encoding::{
    FormatHeader, key_from_bytes, key_to_bytes, params_from_bytes, params_to_bytes,
};
