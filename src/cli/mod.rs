//! CLI command definitions for layerconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod diff;
pub mod export;

use crate::logging::LogTarget;
use clap::{Parser, Subcommand};
use diff::DiffArgs;
use export::ExportArgs;

/// Layered configuration compiler and comparator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_target(&self) -> LogTarget {
        LogTarget::parse(&self.log)
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the built-in defaults, a configuration file and the
    /// environment file, then write the applied configuration
    Export(ExportArgs),

    /// Compare two exported configurations
    Diff(DiffArgs),
}
