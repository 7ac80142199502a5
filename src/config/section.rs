//! Configuration entities.
//!
//! A [`Section`] is one configured record of a kind. Its attributes are an
//! open, ordered mapping; a kind's fixed fields are simply well-known keys
//! (see [`crate::sections`]). An absent key means "unset" and falls through
//! to lower layers or to the kind's default entity during compilation.

use super::merge::{update_attributes, widen_attributes};
use crate::error::{ConfigError, Result};
use crate::types::{AttrMap, Value};
use regex_lite::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Reserved id of a collection kind's default entity.
pub const DEFAULT_ID: &str = "default";

/// Fixed id carried by every unique-kind entity.
pub const UNIQUE_ID: &str = "unique";

/// Reserved kind name of the global-app entity.
pub const GLOBAL_KIND: &str = "GLOBAL";

/// Label used in place of [`GLOBAL_KIND`] in human-facing output.
pub const GLOBAL_DISPLAY_NAME: &str = "Global Configuration";

static ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("id pattern is valid"));

/// Check that `id` can be used as an entity id or a kind name.
pub fn validate_id(id: &str) -> Result<&str> {
    if ID_PATTERN.is_match(id) {
        Ok(id)
    } else {
        Err(ConfigError::InvalidConfigurationId(id.to_string()))
    }
}

/// Whether a kind has a single entity or a collection keyed by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KindNature {
    Unique,
    Collection,
}

impl std::fmt::Display for KindNature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KindNature::Unique => write!(f, "unique"),
            KindNature::Collection => write!(f, "collection"),
        }
    }
}

/// One configured entity, identified by `(kind, id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    kind: String,
    id: String,
    nature: KindNature,
    attributes: AttrMap,
}

impl Section {
    /// Entity of a collection kind.
    pub fn collection(kind: &str, id: &str, attributes: AttrMap) -> Result<Self> {
        validate_id(kind)?;
        validate_id(id)?;
        if kind == GLOBAL_KIND {
            return Err(ConfigError::TypeMismatch(format!(
                "{} is reserved for the global application entity",
                GLOBAL_KIND
            )));
        }
        Ok(Self {
            kind: kind.to_string(),
            id: id.to_string(),
            nature: KindNature::Collection,
            attributes,
        })
    }

    /// Default entity of a collection kind.
    pub fn collection_default(kind: &str, attributes: AttrMap) -> Result<Self> {
        Self::collection(kind, DEFAULT_ID, attributes)
    }

    /// The single entity of a unique kind.
    pub fn unique(kind: &str, attributes: AttrMap) -> Result<Self> {
        validate_id(kind)?;
        if kind == GLOBAL_KIND {
            return Err(ConfigError::TypeMismatch(format!(
                "{} is reserved for the global application entity",
                GLOBAL_KIND
            )));
        }
        Ok(Self {
            kind: kind.to_string(),
            id: UNIQUE_ID.to_string(),
            nature: KindNature::Unique,
            attributes,
        })
    }

    /// Built-in entities whose kind and id are known to be valid.
    pub(crate) fn builtin(kind: &'static str, nature: KindNature, attributes: AttrMap) -> Self {
        let id = match nature {
            KindNature::Unique => UNIQUE_ID,
            KindNature::Collection => DEFAULT_ID,
        };
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
            nature,
            attributes,
        }
    }

    /// The global-app entity.
    pub fn global(attributes: AttrMap) -> Self {
        Self {
            kind: GLOBAL_KIND.to_string(),
            id: UNIQUE_ID.to_string(),
            nature: KindNature::Unique,
            attributes,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn nature(&self) -> KindNature {
        self.nature
    }

    pub fn attributes(&self) -> &AttrMap {
        &self.attributes
    }

    pub fn is_default(&self) -> bool {
        self.nature == KindNature::Collection && self.id == DEFAULT_ID
    }

    pub fn is_global(&self) -> bool {
        self.kind == GLOBAL_KIND
    }

    /// Stored value of an attribute, templates left unresolved.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Builder form of [`Section::set`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Field-by-field update from `other`; keys still unset afterwards are
    /// taken from `default` when one is given.
    pub fn update(&mut self, other: &Section, default: Option<&Section>) {
        update_attributes(&mut self.attributes, &other.attributes);
        if let Some(default) = default {
            widen_attributes(&mut self.attributes, &default.attributes);
        }
    }

    /// Add the keys of `other` this entity does not set yet.
    pub fn widen(&mut self, other: &Section) {
        widen_attributes(&mut self.attributes, &other.attributes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use crate::types::Scope;

    #[test]
    fn test_validate_id() {
        assert!(validate_id("dn_1").is_ok());
        assert!(validate_id("_hidden").is_ok());
        assert!(matches!(
            validate_id("1dn"),
            Err(ConfigError::InvalidConfigurationId(_))
        ));
        assert!(validate_id("my-node").is_err());
        assert!(validate_id("").is_err());
    }

    #[test]
    fn test_global_kind_is_reserved() {
        let err = Section::collection(GLOBAL_KIND, "x", attrs! {}).unwrap_err();
        assert!(matches!(err, ConfigError::TypeMismatch(_)));
        assert!(Section::unique(GLOBAL_KIND, attrs! {}).is_err());
    }

    #[test]
    fn test_update_overwrites_and_keeps() {
        let mut section =
            Section::collection("DATA_NODE", "dn", attrs! {"a" => 1, "b" => "x"}).unwrap();
        let other = Section::collection("DATA_NODE", "dn", attrs! {"b" => "y", "c" => true}).unwrap();
        section.update(&other, None);
        assert_eq!(section.get("a"), Some(&Value::Int(1)));
        assert_eq!(section.get("b"), Some(&Value::from("y")));
        assert_eq!(section.get("c"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_update_falls_back_to_default() {
        let default = Section::collection_default(
            "DATA_NODE",
            attrs! {"storage_type" => "pickle", "scope" => Scope::Scenario},
        )
        .unwrap();
        let mut dn = Section::collection("DATA_NODE", "dn1", attrs! {}).unwrap();
        let incoming = Section::collection("DATA_NODE", "dn1", attrs! {"scope" => Scope::Pipeline}).unwrap();
        dn.update(&incoming, Some(&default));
        assert_eq!(dn.get("storage_type"), Some(&Value::from("pickle")));
        assert_eq!(dn.get("scope"), Some(&Value::Scope(Scope::Pipeline)));
    }

    #[test]
    fn test_widen_keeps_existing() {
        let mut section = Section::unique("JOB", attrs! {"mode" => "standalone"}).unwrap();
        let other = Section::unique("JOB", attrs! {"mode" => "development", "nb" => 2}).unwrap();
        section.widen(&other);
        assert_eq!(section.get("mode"), Some(&Value::from("standalone")));
        assert_eq!(section.get("nb"), Some(&Value::Int(2)));
        assert_eq!(section.id(), UNIQUE_ID);
    }
}
