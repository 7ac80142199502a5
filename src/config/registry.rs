//! Catalog of known kinds.

use super::section::{GLOBAL_KIND, KindNature, Section, validate_id};
use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Known kind names and their nature, in registration order.
///
/// A kind first met in a file has its nature guessed from the table shape.
/// Such a kind stays open: a later explicit registration sets its real
/// nature instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionRegistry {
    kinds: IndexMap<String, KindNature>,
    inferred: HashSet<String>,
}

impl SectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_kind(kind: &str) -> Result<()> {
        validate_id(kind)?;
        if kind == GLOBAL_KIND {
            return Err(ConfigError::TypeMismatch(format!(
                "{} can not be registered as a kind",
                GLOBAL_KIND
            )));
        }
        Ok(())
    }

    /// Record `kind` with the given nature.
    ///
    /// Registering a known kind again is a no-op; registering it with the
    /// other nature is a type mismatch, unless that nature was only guessed.
    pub fn register(&mut self, kind: &str, nature: KindNature) -> Result<()> {
        Self::check_kind(kind)?;
        if self.inferred.remove(kind) {
            self.kinds.insert(kind.to_string(), nature);
            return Ok(());
        }
        match self.kinds.get(kind) {
            Some(existing) if *existing != nature => Err(ConfigError::TypeMismatch(format!(
                "kind {} is registered as {}, not {}",
                kind, existing, nature
            ))),
            Some(_) => Ok(()),
            None => {
                self.kinds.insert(kind.to_string(), nature);
                Ok(())
            }
        }
    }

    /// Record a guessed nature for `kind`. Explicitly registered kinds keep
    /// theirs.
    pub fn infer(&mut self, kind: &str, nature: KindNature) -> Result<()> {
        Self::check_kind(kind)?;
        if self.kinds.contains_key(kind) && !self.inferred.contains(kind) {
            return Ok(());
        }
        self.kinds.insert(kind.to_string(), nature);
        self.inferred.insert(kind.to_string());
        Ok(())
    }

    /// Record the kind of `section`. The global-app entity is accepted as is.
    pub fn register_section(&mut self, section: &Section) -> Result<()> {
        if section.is_global() {
            return Ok(());
        }
        self.register(section.kind(), section.nature())
    }

    /// Nature of a kind, guessed or registered.
    pub fn nature(&self, kind: &str) -> Option<KindNature> {
        self.kinds.get(kind).copied()
    }

    /// Nature of an explicitly registered kind.
    pub fn declared(&self, kind: &str) -> Option<KindNature> {
        if self.inferred.contains(kind) {
            None
        } else {
            self.nature(kind)
        }
    }

    pub fn is_inferred(&self, kind: &str) -> bool {
        self.inferred.contains(kind)
    }

    /// Drop every guessed kind.
    pub fn forget_inferred(&mut self) {
        let inferred = std::mem::take(&mut self.inferred);
        self.kinds.retain(|kind, _| !inferred.contains(kind));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds.contains_key(kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, KindNature)> {
        self.kinds.iter().map(|(k, n)| (k.as_str(), *n))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
