//! Task kind.

use super::{extra_properties, insert_opt, referenced_ids, section_refs};
use crate::attrs;
use crate::config::section::{KindNature, Section};
use crate::config::snapshot::Snapshot;
use crate::config::store::ConfigStore;
use crate::error::Result;
use crate::types::{AttrMap, Value};

pub const KIND: &str = "TASK";

pub const FUNCTION: &str = "function";
pub const INPUTS: &str = "inputs";
pub const OUTPUTS: &str = "outputs";

const FIXED: &[&str] = &[FUNCTION, INPUTS, OUTPUTS];

/// Default task: no function, no inputs, no outputs.
pub fn default_section() -> Section {
    Section::builtin(
        KIND,
        KindNature::Collection,
        attrs! {INPUTS => Value::List(Vec::new()), OUTPUTS => Value::List(Vec::new())},
    )
}

fn attributes(function: Option<&str>, inputs: &[&str], outputs: &[&str], properties: AttrMap) -> AttrMap {
    let mut attributes = AttrMap::new();
    insert_opt(
        &mut attributes,
        FUNCTION,
        function.map(|path| Value::Function(path.to_string())),
    );
    attributes.insert(INPUTS.to_string(), section_refs(inputs));
    attributes.insert(OUTPUTS.to_string(), section_refs(outputs));
    attributes.extend(properties);
    attributes
}

/// Typed view of a task entity.
#[derive(Debug, Clone, Copy)]
pub struct TaskConfig<'a> {
    section: &'a Section,
}

impl<'a> TaskConfig<'a> {
    pub fn new(section: &'a Section) -> Self {
        Self { section }
    }

    pub fn id(&self) -> &'a str {
        self.section.id()
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    /// Dotted path of the function run by the task.
    pub fn function(&self) -> Option<&'a str> {
        match self.section.get(FUNCTION) {
            Some(Value::Function(path)) => Some(path),
            _ => None,
        }
    }

    /// Ids of the input data nodes.
    pub fn inputs(&self) -> Result<Vec<String>> {
        referenced_ids(self.section, INPUTS)
    }

    /// Ids of the output data nodes.
    pub fn outputs(&self) -> Result<Vec<String>> {
        referenced_ids(self.section, OUTPUTS)
    }

    pub fn properties(&self) -> Result<AttrMap> {
        extra_properties(self.section, FIXED)
    }
}

impl Snapshot {
    pub fn tasks(&self) -> Vec<TaskConfig<'_>> {
        self.sections(KIND)
            .map(|sections| sections.values().map(TaskConfig::new).collect())
            .unwrap_or_default()
    }

    pub fn task(&self, id: &str) -> Option<TaskConfig<'_>> {
        self.section(KIND, id).map(TaskConfig::new)
    }
}

impl ConfigStore {
    /// Declare a task. `function` is a dotted path; inputs and outputs are
    /// data node ids.
    pub fn configure_task(
        &self,
        id: &str,
        function: &str,
        inputs: &[&str],
        outputs: &[&str],
        properties: AttrMap,
    ) -> Result<Section> {
        self.configure(Section::collection(
            KIND,
            id,
            attributes(Some(function), inputs, outputs, properties),
        )?)
    }

    pub fn configure_default_task(
        &self,
        function: Option<&str>,
        inputs: &[&str],
        outputs: &[&str],
        properties: AttrMap,
    ) -> Result<Section> {
        self.configure(Section::collection_default(
            KIND,
            attributes(function, inputs, outputs, properties),
        )?)
    }
}
