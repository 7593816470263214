//! # Canon CLI Module
//!
//! This module implements the CLI interface for Canon.
//!
//! ## Available Commands
//!
//! - `replay` - Merge JSON snapshots through the entity cache
//! - `config` - Show the effective configuration

mod commands;

use crate::config::{AppConfig, DEFAULT_CONFIG_FILE};
use canon_core::CanonError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Canon - identity-preserving snapshot replay
///
/// Successive snapshots of the same records are reconciled into one live
/// instance per identity.
#[derive(Parser, Debug)]
#[command(name = "canon")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge snapshot files, in order, into one canonical view
    Replay {
        /// Snapshot files (JSON arrays of records or null)
        #[arg(required = true, num_args = 1..)]
        snapshots: Vec<PathBuf>,

        /// Merge flags, comma-separated (add, remove, update, all, none)
        #[arg(short, long)]
        policy: Option<String>,

        /// Track a query result; repeat for several `name=value` filters
        #[arg(short = 'Q', long = "query")]
        filters: Vec<String>,
    },

    /// Show the effective configuration
    Config,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), CanonError> {
    let config = AppConfig::load(&cli.config)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Replay {
            snapshots,
            policy,
            filters,
        }) => cmd_replay(&config, &snapshots, policy.as_deref(), &filters, json_mode),
        Some(Commands::Config) | None => cmd_config(&config, &cli.config, json_mode),
    }
}
