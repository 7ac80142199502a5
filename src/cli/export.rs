//! Export subcommand for layerconf CLI
//!
//! Writes the applied configuration in any supported format.

use crate::codec::SerializerFormat;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the export subcommand
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Configuration file loaded as the file layer
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format: toml, json or yaml (default: from the output
    /// extension, toml for stdout)
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<SerializerFormat>,

    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip the environment file named by LAYERCONF_CONFIG_PATH
    #[arg(long)]
    pub no_env: bool,
}

impl ExportArgs {
    /// Explicit format, else inferred from the output path.
    pub fn output_format(&self) -> SerializerFormat {
        match (self.format, &self.output) {
            (Some(format), _) => format,
            (None, Some(path)) => SerializerFormat::from_path(path),
            (None, None) => SerializerFormat::default(),
        }
    }
}
