//! layerconf command line.
//!
//! `export` compiles the built-in defaults, an optional configuration file
//! and the environment file, then writes the applied configuration.
//! `diff` compares two exported configurations and fails on changes to
//! blocked kinds.

use anyhow::Result;
use clap::Parser;
use layerconf::cli::diff::{DiffArgs, DiffFormat};
use layerconf::cli::export::ExportArgs;
use layerconf::cli::{Cli, Command};
use layerconf::codec::CallableRegistry;
use layerconf::compare::{CompareOptions, ConfigComparator};
use layerconf::config::{ConfigStore, Snapshot};
use layerconf::error::ConfigError;
use layerconf::logging;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_target(), cli.verbose)?;

    match cli.command {
        Command::Export(args) => run_export(args)?,
        Command::Diff(args) => run_diff(args)?,
    }

    Ok(())
}

/// A store that keeps function and class paths without resolving them:
/// the CLI has no application code to resolve against.
fn cli_store() -> ConfigStore {
    let store = ConfigStore::new();
    store.set_callables(CallableRegistry::lenient());
    store
}

fn run_export(args: ExportArgs) -> Result<()> {
    let store = cli_store();
    if let Some(ref config) = args.config {
        store.load(config)?;
    }
    if !args.no_env {
        store.load_env_from_var()?;
    }

    let format = args.output_format();
    match args.output {
        Some(ref path) => {
            store.export_as(path, format)?;
            eprintln!("Exported to {}", path.display());
        }
        None => print!("{}", store.to_string(format)?),
    }
    Ok(())
}

fn load_snapshot(path: &Path) -> Result<Arc<Snapshot>> {
    let store = cli_store();
    store.load(path)?;
    Ok(store.applied())
}

fn run_diff(args: DiffArgs) -> Result<()> {
    let old = load_snapshot(&args.old)?;
    let new = load_snapshot(&args.new)?;

    let comparator = ConfigComparator::with_unblocked(args.unblocked_kinds());
    let options = CompareOptions {
        old_version: args.old_version.clone(),
        new_version: args.new_version.clone(),
        raise_error: false,
    };
    let result = comparator.compare_with(&old, &new, &options)?;
    info!(
        old = %args.old.display(),
        new = %args.new.display(),
        blocked = result.blocked.len(),
        unblocked = result.unblocked.len(),
        "Configurations compared"
    );

    match args.format {
        DiffFormat::Text => print!("{}", result),
        DiffFormat::Json => {
            let json = serde_json::to_string_pretty(&result)?;
            println!("{}", json);
        }
        DiffFormat::Summary => {
            println!("Diff: {} -> {}", args.old.display(), args.new.display());
            if result.is_empty() {
                println!("No differences found.");
            } else {
                for kind in result.summary() {
                    println!(
                        "  {}{}: +{} -{} ~{}",
                        kind.kind,
                        if kind.blocked { " (blocked)" } else { "" },
                        kind.added,
                        kind.removed,
                        kind.modified
                    );
                }
                println!(
                    "Total: {} changes",
                    result.blocked.len() + result.unblocked.len()
                );
            }
        }
    }

    if result.has_conflicts() && !args.no_raise {
        return Err(ConfigError::ConflictedConfiguration(Box::new(result)).into());
    }
    Ok(())
}
