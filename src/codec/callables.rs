//! Registry of the functions and classes the embedding application exposes
//! to configuration files.

use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque handle registered under a dotted path.
pub type Callable = Arc<dyn Any + Send + Sync>;

/// Which table a reference is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Class,
}

impl CallableKind {
    pub fn tag(&self) -> &'static str {
        match self {
            CallableKind::Function => "function",
            CallableKind::Class => "class",
        }
    }
}

/// Dotted path → value lookup for `function` and `class` tagged values.
///
/// A strict registry rejects unknown paths when reading a file. A lenient
/// one keeps them as path-only references.
#[derive(Clone, Default)]
pub struct CallableRegistry {
    functions: IndexMap<String, Callable>,
    classes: IndexMap<String, Callable>,
    lenient: bool,
}

impl fmt::Debug for CallableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .field("classes", &self.classes.keys().collect::<Vec<_>>())
            .field("lenient", &self.lenient)
            .finish()
    }
}

impl CallableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that accepts any path without resolving it.
    pub fn lenient() -> Self {
        Self {
            lenient: true,
            ..Self::default()
        }
    }

    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    pub fn register_function(&mut self, path: impl Into<String>, value: Callable) {
        self.functions.insert(path.into(), value);
    }

    pub fn register_class(&mut self, path: impl Into<String>, value: Callable) {
        self.classes.insert(path.into(), value);
    }

    pub fn get(&self, kind: CallableKind, path: &str) -> Option<&Callable> {
        match kind {
            CallableKind::Function => self.functions.get(path),
            CallableKind::Class => self.classes.get(path),
        }
    }

    /// Fail unless `path` can be read back.
    pub fn check(&self, kind: CallableKind, path: &str) -> Result<()> {
        if self.lenient || self.get(kind, path).is_some() {
            Ok(())
        } else {
            Err(ConfigError::UnresolvedCallable {
                kind: kind.tag(),
                path: path.to_string(),
            })
        }
    }

    /// Copy the entries of `other` into this registry.
    pub fn extend(&mut self, other: &CallableRegistry) {
        for (path, value) in &other.functions {
            self.functions.insert(path.clone(), value.clone());
        }
        for (path, value) in &other.classes {
            self.classes.insert(path.clone(), value.clone());
        }
    }
}
