//! # Canon
//!
//! Command-line replay of JSON snapshots through the canon-core entity cache.
//!
//! The binary in `main.rs` is a thin shell over these modules so that the
//! command implementations can be tested directly.

pub mod cli;
pub mod config;
pub mod record;
