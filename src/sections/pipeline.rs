//! Pipeline kind.

use super::{extra_properties, referenced_ids, section_refs};
use crate::attrs;
use crate::config::section::{KindNature, Section};
use crate::config::snapshot::Snapshot;
use crate::config::store::ConfigStore;
use crate::error::Result;
use crate::types::{AttrMap, Value};

pub const KIND: &str = "PIPELINE";

pub const TASKS: &str = "tasks";

const FIXED: &[&str] = &[TASKS];

pub fn default_section() -> Section {
    Section::builtin(
        KIND,
        KindNature::Collection,
        attrs! {TASKS => Value::List(Vec::new())},
    )
}

/// Typed view of a pipeline entity.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig<'a> {
    section: &'a Section,
}

impl<'a> PipelineConfig<'a> {
    pub fn new(section: &'a Section) -> Self {
        Self { section }
    }

    pub fn id(&self) -> &'a str {
        self.section.id()
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    /// Ids of the tasks, in execution order.
    pub fn tasks(&self) -> Result<Vec<String>> {
        referenced_ids(self.section, TASKS)
    }

    pub fn properties(&self) -> Result<AttrMap> {
        extra_properties(self.section, FIXED)
    }
}

impl Snapshot {
    pub fn pipelines(&self) -> Vec<PipelineConfig<'_>> {
        self.sections(KIND)
            .map(|sections| sections.values().map(PipelineConfig::new).collect())
            .unwrap_or_default()
    }

    pub fn pipeline(&self, id: &str) -> Option<PipelineConfig<'_>> {
        self.section(KIND, id).map(PipelineConfig::new)
    }
}

impl ConfigStore {
    pub fn configure_pipeline(
        &self,
        id: &str,
        tasks: &[&str],
        mut properties: AttrMap,
    ) -> Result<Section> {
        properties.insert(TASKS.to_string(), section_refs(tasks));
        self.configure(Section::collection(KIND, id, properties)?)
    }

    pub fn configure_default_pipeline(
        &self,
        tasks: &[&str],
        mut properties: AttrMap,
    ) -> Result<Section> {
        properties.insert(TASKS.to_string(), section_refs(tasks));
        self.configure(Section::collection_default(KIND, properties)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configure_pipeline() {
        let store = ConfigStore::new();
        store
            .configure_pipeline("etl", &["extract", "load"], attrs! {"owner" => "data"})
            .unwrap();
        let applied = store.applied();
        let pipeline = applied.pipeline("etl").unwrap();
        assert_eq!(pipeline.tasks().unwrap(), vec!["extract", "load"]);
        assert_eq!(pipeline.properties().unwrap(), attrs! {"owner" => "data"});
    }

    #[test]
    fn test_default_pipeline_properties_are_inherited() {
        let store = ConfigStore::new();
        store
            .configure_default_pipeline(&[], attrs! {"owner" => "platform"})
            .unwrap();
        store.configure_pipeline("p", &["t"], attrs! {}).unwrap();
        let applied = store.applied();
        let p = applied.pipeline("p").unwrap();
        assert_eq!(p.properties().unwrap(), attrs! {"owner" => "platform"});
        assert_eq!(p.tasks().unwrap(), vec!["t"]);
    }
}
