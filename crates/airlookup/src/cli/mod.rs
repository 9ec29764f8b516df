//! Command-line interface for airlookup.
//!
//! This module provides the CLI structure for the `airlookup` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    output_format, ConfigCommand, OnlineCommand, SyncCommand, TableCommand, VaultArgs,
};

/// airlookup - Resolve aircraft metadata from ICAO24 hex addresses
///
/// Looks aircraft up in the public metadata service, or reads and updates
/// them in the aircraft table whose connection string lives in a key vault.
#[derive(Debug, Parser)]
#[command(name = "airlookup")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look an aircraft up in the online metadata service
    Online(OnlineCommand),

    /// Read an aircraft from the table, or upsert it when fields are given
    Table(TableCommand),

    /// Import an aircraft database CSV into the table
    Sync(SyncCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
