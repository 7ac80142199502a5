//! Data node kind.

use super::{extra_properties, insert_opt, resolved, resolved_scope, resolved_str};
use crate::attrs;
use crate::config::section::{KindNature, Section};
use crate::config::snapshot::Snapshot;
use crate::config::store::ConfigStore;
use crate::error::Result;
use crate::template::TargetType;
use crate::types::{AttrMap, Scope, Value};

pub const KIND: &str = "DATA_NODE";

pub const STORAGE_TYPE: &str = "storage_type";
pub const SCOPE: &str = "scope";

pub const STORAGE_TYPE_PICKLE: &str = "pickle";
pub const STORAGE_TYPE_CSV: &str = "csv";
pub const STORAGE_TYPE_JSON: &str = "json";
pub const STORAGE_TYPE_IN_MEMORY: &str = "in_memory";
pub const STORAGE_TYPE_GENERIC: &str = "generic";

pub const DEFAULT_STORAGE_TYPE: &str = STORAGE_TYPE_PICKLE;
pub const DEFAULT_SCOPE: Scope = Scope::Scenario;

// storage-specific attributes
pub const DEFAULT_PATH: &str = "default_path";
pub const HAS_HEADER: &str = "has_header";
pub const ENCODER: &str = "encoder";
pub const DECODER: &str = "decoder";
pub const DEFAULT_DATA: &str = "default_data";
pub const READ_FCT: &str = "read_fct";
pub const WRITE_FCT: &str = "write_fct";
pub const READ_FCT_PARAMS: &str = "read_fct_params";
pub const WRITE_FCT_PARAMS: &str = "write_fct_params";

const FIXED: &[&str] = &[STORAGE_TYPE, SCOPE];

pub fn default_section() -> Section {
    Section::builtin(
        KIND,
        KindNature::Collection,
        attrs! {STORAGE_TYPE => DEFAULT_STORAGE_TYPE, SCOPE => DEFAULT_SCOPE},
    )
}

fn attributes(storage_type: Option<&str>, scope: Option<Scope>, properties: AttrMap) -> AttrMap {
    let mut attributes = AttrMap::new();
    insert_opt(&mut attributes, STORAGE_TYPE, storage_type);
    insert_opt(&mut attributes, SCOPE, scope);
    attributes.extend(properties);
    attributes
}

/// Typed view of a data node entity.
#[derive(Debug, Clone, Copy)]
pub struct DataNodeConfig<'a> {
    section: &'a Section,
}

impl<'a> DataNodeConfig<'a> {
    pub fn new(section: &'a Section) -> Self {
        Self { section }
    }

    pub fn id(&self) -> &'a str {
        self.section.id()
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    pub fn storage_type(&self) -> Result<String> {
        Ok(resolved_str(self.section, STORAGE_TYPE)?
            .unwrap_or_else(|| DEFAULT_STORAGE_TYPE.to_string()))
    }

    pub fn scope(&self) -> Result<Scope> {
        Ok(resolved_scope(self.section, SCOPE)?.unwrap_or(DEFAULT_SCOPE))
    }

    /// Storage-specific and open properties, templates resolved.
    pub fn properties(&self) -> Result<AttrMap> {
        extra_properties(self.section, FIXED)
    }

    pub fn property(&self, name: &str) -> Result<Option<Value>> {
        resolved(self.section, name, TargetType::Any)
    }
}

impl Snapshot {
    /// Data node views by id, default included.
    pub fn data_nodes(&self) -> Vec<DataNodeConfig<'_>> {
        self.sections(KIND)
            .map(|sections| sections.values().map(DataNodeConfig::new).collect())
            .unwrap_or_default()
    }

    pub fn data_node(&self, id: &str) -> Option<DataNodeConfig<'_>> {
        self.section(KIND, id).map(DataNodeConfig::new)
    }
}

impl ConfigStore {
    /// Declare a data node. Unset fields inherit from the default data node.
    pub fn configure_data_node(
        &self,
        id: &str,
        storage_type: Option<&str>,
        scope: Option<Scope>,
        properties: AttrMap,
    ) -> Result<Section> {
        self.configure(Section::collection(
            KIND,
            id,
            attributes(storage_type, scope, properties),
        )?)
    }

    /// Set the default data node every data node inherits from.
    pub fn configure_default_data_node(
        &self,
        storage_type: &str,
        scope: Option<Scope>,
        properties: AttrMap,
    ) -> Result<Section> {
        self.configure(Section::collection_default(
            KIND,
            attributes(Some(storage_type), Some(scope.unwrap_or(DEFAULT_SCOPE)), properties),
        )?)
    }

    pub fn configure_csv_data_node(
        &self,
        id: &str,
        default_path: Option<&str>,
        has_header: bool,
        scope: Option<Scope>,
        mut properties: AttrMap,
    ) -> Result<Section> {
        insert_opt(&mut properties, DEFAULT_PATH, default_path);
        properties.insert(HAS_HEADER.to_string(), Value::Bool(has_header));
        self.configure_data_node(id, Some(STORAGE_TYPE_CSV), scope, properties)
    }

    /// `encoder` and `decoder` are dotted class paths.
    pub fn configure_json_data_node(
        &self,
        id: &str,
        default_path: Option<&str>,
        encoder: Option<&str>,
        decoder: Option<&str>,
        scope: Option<Scope>,
        mut properties: AttrMap,
    ) -> Result<Section> {
        insert_opt(&mut properties, DEFAULT_PATH, default_path);
        insert_opt(
            &mut properties,
            ENCODER,
            encoder.map(|path| Value::Class(path.to_string())),
        );
        insert_opt(
            &mut properties,
            DECODER,
            decoder.map(|path| Value::Class(path.to_string())),
        );
        self.configure_data_node(id, Some(STORAGE_TYPE_JSON), scope, properties)
    }

    pub fn configure_pickle_data_node(
        &self,
        id: &str,
        default_data: Option<Value>,
        scope: Option<Scope>,
        mut properties: AttrMap,
    ) -> Result<Section> {
        insert_opt(&mut properties, DEFAULT_DATA, default_data);
        self.configure_data_node(id, Some(STORAGE_TYPE_PICKLE), scope, properties)
    }

    pub fn configure_in_memory_data_node(
        &self,
        id: &str,
        default_data: Option<Value>,
        scope: Option<Scope>,
        mut properties: AttrMap,
    ) -> Result<Section> {
        insert_opt(&mut properties, DEFAULT_DATA, default_data);
        self.configure_data_node(id, Some(STORAGE_TYPE_IN_MEMORY), scope, properties)
    }

    /// `read_fct` and `write_fct` are dotted function paths.
    #[allow(clippy::too_many_arguments)]
    pub fn configure_generic_data_node(
        &self,
        id: &str,
        read_fct: Option<&str>,
        write_fct: Option<&str>,
        read_fct_params: Option<Vec<Value>>,
        write_fct_params: Option<Vec<Value>>,
        scope: Option<Scope>,
        mut properties: AttrMap,
    ) -> Result<Section> {
        insert_opt(
            &mut properties,
            READ_FCT,
            read_fct.map(|path| Value::Function(path.to_string())),
        );
        insert_opt(
            &mut properties,
            WRITE_FCT,
            write_fct.map(|path| Value::Function(path.to_string())),
        );
        insert_opt(&mut properties, READ_FCT_PARAMS, read_fct_params);
        insert_opt(&mut properties, WRITE_FCT_PARAMS, write_fct_params);
        self.configure_data_node(id, Some(STORAGE_TYPE_GENERIC), scope, properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherits_default_storage_type() {
        let store = ConfigStore::new();
        store
            .configure_data_node("dn1", None, Some(Scope::Pipeline), attrs! {})
            .unwrap();
        let applied = store.applied();
        let dn1 = applied.data_node("dn1").unwrap();
        assert_eq!(dn1.storage_type().unwrap(), "pickle");
        assert_eq!(dn1.scope().unwrap(), Scope::Pipeline);
    }

    #[test]
    fn test_configure_default_data_node() {
        let store = ConfigStore::new();
        store
            .configure_default_data_node("csv", None, attrs! {"sep" => ";"})
            .unwrap();
        store.configure_data_node("dn", None, None, attrs! {}).unwrap();
        let applied = store.applied();
        let dn = applied.data_node("dn").unwrap();
        assert_eq!(dn.storage_type().unwrap(), "csv");
        assert_eq!(dn.scope().unwrap(), Scope::Scenario);
        assert_eq!(dn.property("sep").unwrap(), Some(Value::from(";")));
    }

    #[test]
    fn test_csv_helper() {
        let store = ConfigStore::new();
        let dn = store
            .configure_csv_data_node("sales", Some("data/sales.csv"), true, None, attrs! {})
            .unwrap();
        assert_eq!(dn.get(STORAGE_TYPE), Some(&Value::from("csv")));
        assert_eq!(dn.get(DEFAULT_PATH), Some(&Value::from("data/sales.csv")));
        assert_eq!(dn.get(HAS_HEADER), Some(&Value::Bool(true)));
        assert_eq!(dn.get(SCOPE), Some(&Value::Scope(Scope::Scenario)));
    }

    #[test]
    fn test_generic_helper_stores_function_refs() {
        let store = ConfigStore::new();
        let dn = store
            .configure_generic_data_node(
                "gen",
                Some("app.io.read"),
                Some("app.io.write"),
                Some(vec![Value::Int(1)]),
                None,
                Some(Scope::Global),
                attrs! {},
            )
            .unwrap();
        assert_eq!(dn.get(READ_FCT), Some(&Value::Function("app.io.read".into())));
        assert_eq!(dn.get(READ_FCT_PARAMS), Some(&Value::from(vec![1])));
        assert!(dn.get(WRITE_FCT_PARAMS).is_none());
    }

    #[test]
    fn test_data_nodes_lists_default() {
        let store = ConfigStore::new();
        store.configure_data_node("a", None, None, attrs! {}).unwrap();
        let applied = store.applied();
        let ids: Vec<&str> = applied.data_nodes().iter().map(|d| d.id()).collect();
        assert_eq!(ids, vec!["default", "a"]);
    }
}
