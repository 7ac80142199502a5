//! Diff subcommand for layerconf CLI
//!
//! Compares two exported configurations.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the diff subcommand
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Old configuration file
    #[arg(value_name = "OLD")]
    pub old: PathBuf,

    /// New configuration file
    #[arg(value_name = "NEW")]
    pub new: PathBuf,

    /// Kinds allowed to change (comma-separated, GLOBAL for the global app)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub unblock: Option<Vec<String>>,

    /// Exit successfully even when blocked kinds changed
    #[arg(long)]
    pub no_raise: bool,

    /// Version label of the old configuration, used in log lines
    #[arg(long, value_name = "VERSION")]
    pub old_version: Option<String>,

    /// Version label of the new configuration, used in log lines
    #[arg(long, value_name = "VERSION")]
    pub new_version: Option<String>,

    /// Output format: text (default), json, or summary
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    pub format: DiffFormat,
}

/// Output format for diff results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffFormat {
    #[default]
    Text,
    Json,
    Summary,
}

impl std::str::FromStr for DiffFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(DiffFormat::Text),
            "json" => Ok(DiffFormat::Json),
            "summary" => Ok(DiffFormat::Summary),
            _ => Err(format!(
                "Invalid format '{}'. Valid options: text, json, summary",
                s
            )),
        }
    }
}

impl std::fmt::Display for DiffFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffFormat::Text => write!(f, "text"),
            DiffFormat::Json => write!(f, "json"),
            DiffFormat::Summary => write!(f, "summary"),
        }
    }
}

impl DiffArgs {
    /// Kinds passed to `--unblock`, empty names dropped.
    pub fn unblocked_kinds(&self) -> Vec<&str> {
        self.unblock
            .iter()
            .flatten()
            .map(|kind| kind.trim())
            .filter(|kind| !kind.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_format_parse() {
        assert_eq!("text".parse::<DiffFormat>().unwrap(), DiffFormat::Text);
        assert_eq!("json".parse::<DiffFormat>().unwrap(), DiffFormat::Json);
        assert_eq!("summary".parse::<DiffFormat>().unwrap(), DiffFormat::Summary);
        assert_eq!("JSON".parse::<DiffFormat>().unwrap(), DiffFormat::Json);
        assert!("invalid".parse::<DiffFormat>().is_err());
    }

    #[test]
    fn test_unblocked_kinds() {
        let args = DiffArgs {
            old: PathBuf::from("old.toml"),
            new: PathBuf::from("new.toml"),
            unblock: Some(vec!["DATA_NODE".to_string(), " ".to_string(), "GLOBAL".to_string()]),
            no_raise: false,
            old_version: None,
            new_version: None,
            format: DiffFormat::Text,
        };
        assert_eq!(args.unblocked_kinds(), vec!["DATA_NODE", "GLOBAL"]);
    }
}
