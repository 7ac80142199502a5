//! Global application entity.

use super::{extra_properties, resolved, resolved_str};
use crate::attrs;
use crate::config::section::Section;
use crate::config::snapshot::Snapshot;
use crate::error::Result;
use crate::template::{TargetType, TemplateResolver};
use crate::types::{AttrMap, Value};

pub const ROOT_FOLDER: &str = "root_folder";
pub const STORAGE_FOLDER: &str = "storage_folder";
pub const CLEAN_ENTITIES_ENABLED: &str = "clean_entities_enabled";
pub const REPOSITORY_TYPE: &str = "repository_type";
pub const REPOSITORY_PROPERTIES: &str = "repository_properties";

pub const DEFAULT_ROOT_FOLDER: &str = "./layerconf/";
pub const DEFAULT_STORAGE_FOLDER: &str = ".data/";
pub const DEFAULT_REPOSITORY_TYPE: &str = "filesystem";
pub const DEFAULT_CLEAN_ENTITIES_ENABLED: bool = false;

/// Variable the default `clean_entities_enabled` template points at.
pub const CLEAN_ENTITIES_ENABLED_ENV: &str = "LAYERCONF_CLEAN_ENTITIES_ENABLED";

const FIXED: &[&str] = &[
    ROOT_FOLDER,
    STORAGE_FOLDER,
    CLEAN_ENTITIES_ENABLED,
    REPOSITORY_TYPE,
    REPOSITORY_PROPERTIES,
];

/// Baseline global-app entity. `repository_properties` is left unset.
pub fn default_section() -> Section {
    Section::global(attrs! {
        ROOT_FOLDER => DEFAULT_ROOT_FOLDER,
        STORAGE_FOLDER => DEFAULT_STORAGE_FOLDER,
        CLEAN_ENTITIES_ENABLED => format!("ENV[{}]", CLEAN_ENTITIES_ENABLED_ENV),
        REPOSITORY_TYPE => DEFAULT_REPOSITORY_TYPE,
    })
}

/// Typed view of the global-app entity.
#[derive(Debug, Clone, Copy)]
pub struct GlobalAppConfig<'a> {
    section: &'a Section,
}

impl<'a> GlobalAppConfig<'a> {
    pub fn new(section: &'a Section) -> Self {
        Self { section }
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    pub fn root_folder(&self) -> Result<Option<String>> {
        resolved_str(self.section, ROOT_FOLDER)
    }

    pub fn storage_folder(&self) -> Result<Option<String>> {
        resolved_str(self.section, STORAGE_FOLDER)
    }

    /// `<root_folder><storage_folder>`.
    pub fn storage_path(&self) -> Result<String> {
        Ok(format!(
            "{}{}",
            self.root_folder()?.unwrap_or_default(),
            self.storage_folder()?.unwrap_or_default()
        ))
    }

    /// Falls back to `false` when unset or when its variable is absent.
    pub fn clean_entities_enabled(&self) -> Result<bool> {
        let Some(stored) = self.section.get(CLEAN_ENTITIES_ENABLED) else {
            return Ok(DEFAULT_CLEAN_ENTITIES_ENABLED);
        };
        let default = Value::Bool(DEFAULT_CLEAN_ENTITIES_ENABLED);
        let value = TemplateResolver::process().resolve_opt(
            stored,
            TargetType::Bool,
            false,
            Some(&default),
        )?;
        Ok(value
            .and_then(|v| v.as_bool())
            .unwrap_or(DEFAULT_CLEAN_ENTITIES_ENABLED))
    }

    pub fn repository_type(&self) -> Result<Option<String>> {
        resolved_str(self.section, REPOSITORY_TYPE)
    }

    /// Repository settings, empty when unset.
    pub fn repository_properties(&self) -> Result<AttrMap> {
        match resolved(self.section, REPOSITORY_PROPERTIES, TargetType::Any)? {
            Some(Value::Map(map)) => Ok(map),
            _ => Ok(AttrMap::new()),
        }
    }

    /// Open properties, templates resolved.
    pub fn properties(&self) -> Result<AttrMap> {
        extra_properties(self.section, FIXED)
    }

    pub fn property(&self, name: &str) -> Result<Option<Value>> {
        resolved(self.section, name, TargetType::Any)
    }
}

impl Snapshot {
    pub fn global_app(&self) -> GlobalAppConfig<'_> {
        GlobalAppConfig::new(self.global())
    }
}

/// Global-app attributes for [`ConfigStore::configure_global_app`](crate::ConfigStore::configure_global_app).
#[derive(Debug, Clone, Default)]
pub struct GlobalAppSettings {
    pub root_folder: Option<String>,
    pub storage_folder: Option<String>,
    pub clean_entities_enabled: Option<Value>,
    pub repository_type: Option<String>,
    pub repository_properties: Option<AttrMap>,
    pub properties: AttrMap,
}

impl GlobalAppSettings {
    pub fn into_attributes(self) -> AttrMap {
        let mut attributes = AttrMap::new();
        super::insert_opt(&mut attributes, ROOT_FOLDER, self.root_folder);
        super::insert_opt(&mut attributes, STORAGE_FOLDER, self.storage_folder);
        super::insert_opt(&mut attributes, CLEAN_ENTITIES_ENABLED, self.clean_entities_enabled);
        super::insert_opt(&mut attributes, REPOSITORY_TYPE, self.repository_type);
        super::insert_opt(&mut attributes, REPOSITORY_PROPERTIES, self.repository_properties);
        attributes.extend(self.properties);
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let section = default_section();
        let view = GlobalAppConfig::new(&section);
        assert_eq!(view.root_folder().unwrap().as_deref(), Some("./layerconf/"));
        assert_eq!(view.storage_folder().unwrap().as_deref(), Some(".data/"));
        assert_eq!(view.storage_path().unwrap(), "./layerconf/.data/");
        assert_eq!(view.repository_type().unwrap().as_deref(), Some("filesystem"));
        assert!(view.repository_properties().unwrap().is_empty());
        assert!(section.get(REPOSITORY_PROPERTIES).is_none());
    }

    #[test]
    fn test_clean_entities_template_is_stored_raw() {
        let section = default_section();
        assert_eq!(
            section.get(CLEAN_ENTITIES_ENABLED),
            Some(&Value::from("ENV[LAYERCONF_CLEAN_ENTITIES_ENABLED]"))
        );
    }

    #[test]
    fn test_clean_entities_literal() {
        let section = Section::global(attrs! {CLEAN_ENTITIES_ENABLED => true});
        assert!(GlobalAppConfig::new(&section).clean_entities_enabled().unwrap());
        let section = Section::global(attrs! {});
        assert!(!GlobalAppConfig::new(&section).clean_entities_enabled().unwrap());
    }

    #[test]
    fn test_settings_into_attributes() {
        let settings = GlobalAppSettings {
            root_folder: Some("/srv/app/".into()),
            clean_entities_enabled: Some(Value::Bool(true)),
            properties: attrs! {"owner" => "ops"},
            ..Default::default()
        };
        let attributes = settings.into_attributes();
        assert_eq!(
            attributes,
            attrs! {ROOT_FOLDER => "/srv/app/", CLEAN_ENTITIES_ENABLED => true, "owner" => "ops"}
        );
    }
}
