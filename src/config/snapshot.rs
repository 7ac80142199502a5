//! Configuration snapshots.

use super::merge::merge_collection;
use super::section::{GLOBAL_KIND, KindNature, Section};
use crate::error::{ConfigError, Result};
use crate::types::{AttrMap, Value};
use indexmap::IndexMap;
use tracing::debug;

/// One global-app entity, the unique-kind entities and the collection-kind
/// entities keyed by id.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    global: Section,
    unique: IndexMap<String, Section>,
    collections: IndexMap<String, IndexMap<String, Section>>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl Snapshot {
    /// Snapshot with an attribute-less global-app entity and no kinds.
    pub fn empty() -> Self {
        Self {
            global: Section::global(AttrMap::new()),
            unique: IndexMap::new(),
            collections: IndexMap::new(),
        }
    }

    pub fn global(&self) -> &Section {
        &self.global
    }

    pub fn unique(&self, kind: &str) -> Option<&Section> {
        self.unique.get(kind)
    }

    /// All entities of a collection kind, default included.
    pub fn sections(&self, kind: &str) -> Option<&IndexMap<String, Section>> {
        self.collections.get(kind)
    }

    pub fn section(&self, kind: &str, id: &str) -> Option<&Section> {
        self.collections.get(kind).and_then(|sections| sections.get(id))
    }

    /// Look an entity up by kind, whatever its nature.
    pub fn find(&self, kind: &str, id: &str) -> Option<&Section> {
        if kind == GLOBAL_KIND {
            return Some(&self.global);
        }
        self.unique(kind).or_else(|| self.section(kind, id))
    }

    pub fn unique_sections(&self) -> &IndexMap<String, Section> {
        &self.unique
    }

    pub fn collections(&self) -> &IndexMap<String, IndexMap<String, Section>> {
        &self.collections
    }

    /// Nature of a kind present in this snapshot.
    pub fn nature(&self, kind: &str) -> Option<KindNature> {
        if kind == GLOBAL_KIND || self.unique.contains_key(kind) {
            Some(KindNature::Unique)
        } else if self.collections.contains_key(kind) {
            Some(KindNature::Collection)
        } else {
            None
        }
    }

    /// Whether nothing but an empty global-app entity is present.
    pub fn is_empty(&self) -> bool {
        self.global.attributes().is_empty() && self.unique.is_empty() && self.collections.is_empty()
    }

    /// Declare a collection kind without entities.
    pub fn ensure_collection(&mut self, kind: &str) {
        self.collections.entry(kind.to_string()).or_default();
    }

    /// Store `section`. A collection entity replaces any entity with the
    /// same id; unique and global-app entities are updated field by field.
    pub fn put(&mut self, section: Section) {
        if section.is_global() {
            self.global.update(&section, None);
            return;
        }
        match section.nature() {
            KindNature::Unique => match self.unique.get_mut(section.kind()) {
                Some(current) => current.update(&section, None),
                None => {
                    self.unique.insert(section.kind().to_string(), section);
                }
            },
            KindNature::Collection => {
                self.collections
                    .entry(section.kind().to_string())
                    .or_default()
                    .insert(section.id().to_string(), section);
            }
        }
    }

    /// Store `section`, keeping the values of any entity already present
    /// and adding only the attributes it does not set yet.
    pub fn widen(&mut self, section: Section) {
        if section.is_global() {
            self.global.widen(&section);
            return;
        }
        let slot = match section.nature() {
            KindNature::Unique => self.unique.get_mut(section.kind()),
            KindNature::Collection => self
                .collections
                .get_mut(section.kind())
                .and_then(|sections| sections.get_mut(section.id())),
        };
        match slot {
            Some(current) => current.widen(&section),
            None => self.put(section),
        }
    }

    /// Move the entities of `kind` to `nature`.
    ///
    /// A collection becomes one unique entity holding a map attribute per
    /// former entity id. A unique entity becomes a collection with one entity
    /// per attribute, each of which must be a map.
    pub fn reshape(&mut self, kind: &str, nature: KindNature) -> Result<()> {
        match nature {
            KindNature::Unique => {
                let Some(sections) = self.collections.shift_remove(kind) else {
                    return Ok(());
                };
                let attributes: AttrMap = sections
                    .into_iter()
                    .map(|(id, section)| (id, Value::Map(section.attributes().clone())))
                    .collect();
                self.unique
                    .insert(kind.to_string(), Section::unique(kind, attributes)?);
            }
            KindNature::Collection => {
                let Some(section) = self.unique.shift_remove(kind) else {
                    return Ok(());
                };
                let mut sections = IndexMap::new();
                for (id, value) in section.attributes() {
                    let Value::Map(attributes) = value else {
                        return Err(ConfigError::TypeMismatch(format!(
                            "{} can not become a collection: attribute {} is {}, not a map",
                            kind,
                            id,
                            value.type_name()
                        )));
                    };
                    sections.insert(
                        id.clone(),
                        Section::collection(kind, id, attributes.clone())?,
                    );
                }
                self.collections.insert(kind.to_string(), sections);
            }
        }
        Ok(())
    }

    /// Fold `other` into this snapshot, `other` taking precedence.
    pub fn merge(&mut self, other: &Snapshot) {
        self.global.update(&other.global, None);

        for (kind, section) in &other.unique {
            match self.unique.get_mut(kind) {
                Some(current) => current.update(section, None),
                None => {
                    self.unique.insert(kind.clone(), section.clone());
                }
            }
        }

        for (kind, sections) in &other.collections {
            debug!(kind = %kind, entities = sections.len(), "Merging collection");
            let result = self.collections.entry(kind.clone()).or_default();
            merge_collection(result, sections);
        }
    }
}
