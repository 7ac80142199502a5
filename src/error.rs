//! Error taxonomy for configuration loading, compiling and comparing.

use crate::compare::ComparatorResult;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors
    LoadingError,
    UnknownSerializer,
    InconsistentEnvVariable,
    InvalidConfigurationId,
    UnresolvedCallable,
    TypeMismatch,

    // State errors
    ConfigurationUpdateBlocked,
    ConflictedConfiguration,
    ConfigurationIssue,

    // Internal errors
    IoError,
}

/// Every failure the configuration engine can raise.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed or unparsable content, or an unknown type tag.
    #[error("Can not load configuration: {0}")]
    Loading(String),

    #[error("Serializer {0} is not supported")]
    UnknownSerializer(String),

    /// Missing or untypeable `ENV[NAME]` indirection.
    #[error("Environment variable {name} is inconsistent: {reason}")]
    InconsistentEnvVariable { name: String, reason: String },

    #[error("Configuration update is blocked")]
    ConfigurationUpdateBlocked,

    /// The comparator found differences in kinds that are not allow-listed.
    #[error("Conflicted configuration: {} blocked change(s)", .0.blocked.len())]
    ConflictedConfiguration(Box<ComparatorResult>),

    #[error("Configuration issues found: {errors} error(s)")]
    ConfigurationIssue { errors: usize },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Invalid configuration id '{0}': ids must be identifiers")]
    InvalidConfigurationId(String),

    #[error("Unresolved {kind} reference '{path}'")]
    UnresolvedCallable { kind: &'static str, path: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn loading(reason: impl Into<String>) -> Self {
        ConfigError::Loading(reason.into())
    }

    pub fn inconsistent_env(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::InconsistentEnvVariable {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    /// Code identifying the failure kind.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Loading(_) => ErrorCode::LoadingError,
            ConfigError::UnknownSerializer(_) => ErrorCode::UnknownSerializer,
            ConfigError::InconsistentEnvVariable { .. } => ErrorCode::InconsistentEnvVariable,
            ConfigError::ConfigurationUpdateBlocked => ErrorCode::ConfigurationUpdateBlocked,
            ConfigError::ConflictedConfiguration(_) => ErrorCode::ConflictedConfiguration,
            ConfigError::ConfigurationIssue { .. } => ErrorCode::ConfigurationIssue,
            ConfigError::TypeMismatch(_) => ErrorCode::TypeMismatch,
            ConfigError::InvalidConfigurationId(_) => ErrorCode::InvalidConfigurationId,
            ConfigError::UnresolvedCallable { .. } => ErrorCode::UnresolvedCallable,
            ConfigError::Io { .. } => ErrorCode::IoError,
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
