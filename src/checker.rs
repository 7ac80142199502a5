//! Validation boundary.
//!
//! Rules implement [`ConfigChecker`] and report findings into an
//! [`IssueCollector`]. No rule ships with the engine.

use crate::config::snapshot::Snapshot;
use serde::Serialize;
use std::fmt;

/// Severity of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueLevel {
    Error,
    Warning,
    Info,
}

impl fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueLevel::Error => write!(f, "ERROR"),
            IssueLevel::Warning => write!(f, "WARNING"),
            IssueLevel::Info => write!(f, "INFO"),
        }
    }
}

/// One finding reported by a checker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub level: IssueLevel,
    /// Attribute or entity the issue is about.
    pub field: String,
    /// Offending value, rendered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub message: String,
    /// Name of the checker that reported it.
    pub checker: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.checker, self.message)?;
        if let Some(value) = &self.value {
            write!(f, " (field: {}, value: {})", self.field, value)?;
        } else {
            write!(f, " (field: {})", self.field)?;
        }
        Ok(())
    }
}

/// Accumulates issues by severity.
#[derive(Debug, Clone, Default)]
pub struct IssueCollector {
    errors: Vec<Issue>,
    warnings: Vec<Issue>,
    infos: Vec<Issue>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(
        &mut self,
        level: IssueLevel,
        field: &str,
        value: Option<String>,
        message: impl Into<String>,
        checker: &str,
    ) {
        let issue = Issue {
            level,
            field: field.to_string(),
            value,
            message: message.into(),
            checker: checker.to_string(),
        };
        match level {
            IssueLevel::Error => self.errors.push(issue),
            IssueLevel::Warning => self.warnings.push(issue),
            IssueLevel::Info => self.infos.push(issue),
        }
    }

    pub fn add_error(
        &mut self,
        field: &str,
        value: Option<String>,
        message: impl Into<String>,
        checker: &str,
    ) {
        self.push(IssueLevel::Error, field, value, message, checker);
    }

    pub fn add_warning(
        &mut self,
        field: &str,
        value: Option<String>,
        message: impl Into<String>,
        checker: &str,
    ) {
        self.push(IssueLevel::Warning, field, value, message, checker);
    }

    pub fn add_info(
        &mut self,
        field: &str,
        value: Option<String>,
        message: impl Into<String>,
        checker: &str,
    ) {
        self.push(IssueLevel::Info, field, value, message, checker);
    }

    pub fn errors(&self) -> &[Issue] {
        &self.errors
    }

    pub fn warnings(&self) -> &[Issue] {
        &self.warnings
    }

    pub fn infos(&self) -> &[Issue] {
        &self.infos
    }

    /// Every issue, errors first, then warnings, then infos.
    pub fn all(&self) -> Vec<&Issue> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.infos.iter())
            .collect()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty() && self.infos.is_empty()
    }

    /// Emit every collected issue at its own level.
    pub fn log(&self) {
        for issue in &self.warnings {
            tracing::warn!(checker = %issue.checker, field = %issue.field, "{}", issue);
        }
        for issue in &self.infos {
            tracing::info!(checker = %issue.checker, field = %issue.field, "{}", issue);
        }
        for issue in &self.errors {
            tracing::error!(checker = %issue.checker, field = %issue.field, "{}", issue);
        }
    }
}

/// A validation rule run over a compiled snapshot.
pub trait ConfigChecker {
    /// Name reported with every issue.
    fn name(&self) -> &str;

    fn check(&self, snapshot: &Snapshot, collector: &mut IssueCollector);
}
