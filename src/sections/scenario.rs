//! Scenario kind.

use super::{extra_properties, insert_opt, referenced_ids, resolved_frequency, section_refs};
use crate::attrs;
use crate::config::section::{KindNature, Section};
use crate::config::snapshot::Snapshot;
use crate::config::store::ConfigStore;
use crate::error::{ConfigError, Result};
use crate::types::{AttrMap, Frequency, Value};
use indexmap::IndexMap;

pub const KIND: &str = "SCENARIO";

pub const PIPELINES: &str = "pipelines";
pub const FREQUENCY: &str = "frequency";
pub const COMPARATORS: &str = "comparators";

const FIXED: &[&str] = &[PIPELINES, FREQUENCY, COMPARATORS];

/// Data node id → dotted paths of the functions comparing its data.
pub type Comparators = IndexMap<String, Vec<String>>;

pub fn default_section() -> Section {
    Section::builtin(
        KIND,
        KindNature::Collection,
        attrs! {PIPELINES => Value::List(Vec::new()), COMPARATORS => AttrMap::new()},
    )
}

fn comparators_value(comparators: &Comparators) -> Value {
    Value::Map(
        comparators
            .iter()
            .map(|(dn, paths)| {
                let functions = paths.iter().map(|p| Value::Function(p.clone())).collect();
                (dn.clone(), Value::List(functions))
            })
            .collect(),
    )
}

fn attributes(
    pipelines: &[&str],
    frequency: Option<Frequency>,
    comparators: Option<&Comparators>,
    properties: AttrMap,
) -> AttrMap {
    let mut attributes = AttrMap::new();
    attributes.insert(PIPELINES.to_string(), section_refs(pipelines));
    insert_opt(&mut attributes, FREQUENCY, frequency);
    insert_opt(&mut attributes, COMPARATORS, comparators.map(comparators_value));
    attributes.extend(properties);
    attributes
}

/// Typed view of a scenario entity.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioConfig<'a> {
    section: &'a Section,
}

impl<'a> ScenarioConfig<'a> {
    pub fn new(section: &'a Section) -> Self {
        Self { section }
    }

    pub fn id(&self) -> &'a str {
        self.section.id()
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    pub fn pipelines(&self) -> Result<Vec<String>> {
        referenced_ids(self.section, PIPELINES)
    }

    pub fn frequency(&self) -> Result<Option<Frequency>> {
        resolved_frequency(self.section, FREQUENCY)
    }

    /// Comparator function paths by data node id. A single function counts
    /// as a one-element list.
    pub fn comparators(&self) -> Result<Comparators> {
        let Some(stored) = self.section.get(COMPARATORS) else {
            return Ok(Comparators::new());
        };
        let invalid = || {
            ConfigError::TypeMismatch(format!(
                "{} {}: comparators must map data node ids to functions",
                KIND,
                self.section.id()
            ))
        };
        let map = stored.as_map().ok_or_else(invalid)?;
        map.iter()
            .map(|(dn, value)| -> Result<(String, Vec<String>)> {
                let paths = match value {
                    Value::Function(path) => vec![path.clone()],
                    Value::List(items) => items
                        .iter()
                        .map(|item| match item {
                            Value::Function(path) => Ok(path.clone()),
                            _ => Err(invalid()),
                        })
                        .collect::<Result<Vec<_>>>()?,
                    _ => return Err(invalid()),
                };
                Ok((dn.clone(), paths))
            })
            .collect()
    }

    pub fn properties(&self) -> Result<AttrMap> {
        extra_properties(self.section, FIXED)
    }
}

impl Snapshot {
    pub fn scenarios(&self) -> Vec<ScenarioConfig<'_>> {
        self.sections(KIND)
            .map(|sections| sections.values().map(ScenarioConfig::new).collect())
            .unwrap_or_default()
    }

    pub fn scenario(&self, id: &str) -> Option<ScenarioConfig<'_>> {
        self.section(KIND, id).map(ScenarioConfig::new)
    }
}

impl ConfigStore {
    pub fn configure_scenario(
        &self,
        id: &str,
        pipelines: &[&str],
        frequency: Option<Frequency>,
        comparators: Option<&Comparators>,
        properties: AttrMap,
    ) -> Result<Section> {
        self.configure(Section::collection(
            KIND,
            id,
            attributes(pipelines, frequency, comparators, properties),
        )?)
    }

    /// Declare a scenario made of one new pipeline holding `tasks`. The
    /// pipeline id defaults to `<id>_pipeline`.
    pub fn configure_scenario_from_tasks(
        &self,
        id: &str,
        tasks: &[&str],
        frequency: Option<Frequency>,
        comparators: Option<&Comparators>,
        pipeline_id: Option<&str>,
        properties: AttrMap,
    ) -> Result<Section> {
        let pipeline_id = match pipeline_id {
            Some(pid) => pid.to_string(),
            None => format!("{}_pipeline", id),
        };
        self.configure_pipeline(&pipeline_id, tasks, properties.clone())?;
        self.configure_scenario(id, &[pipeline_id.as_str()], frequency, comparators, properties)
    }

    pub fn configure_default_scenario(
        &self,
        pipelines: &[&str],
        frequency: Option<Frequency>,
        comparators: Option<&Comparators>,
        properties: AttrMap,
    ) -> Result<Section> {
        self.configure(Section::collection_default(
            KIND,
            attributes(pipelines, frequency, comparators, properties),
        )?)
    }
}
