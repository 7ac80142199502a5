//! Built-in kinds.
//!
//! Each kind gets its default entity, `configure_*` entry points on
//! [`ConfigStore`](crate::ConfigStore) and a read-only typed view over the
//! applied [`Snapshot`](crate::Snapshot). Views resolve `ENV[NAME]`
//! templates on every read. Custom kinds are handled through the generic
//! [`Section`] API instead.

pub mod data_node;
pub mod global_app;
pub mod job;
pub mod pipeline;
pub mod scenario;
pub mod task;

use crate::config::section::Section;
use crate::error::{ConfigError, Result};
use crate::template::{TargetType, TemplateResolver};
use crate::types::{AttrMap, Frequency, Scope, Value};

/// Default entities of the global app and every built-in kind.
pub fn builtin_defaults() -> Vec<Section> {
    vec![
        global_app::default_section(),
        job::default_section(),
        data_node::default_section(),
        task::default_section(),
        pipeline::default_section(),
        scenario::default_section(),
    ]
}

/// Read an attribute, resolving templates.
pub(crate) fn resolved(section: &Section, name: &str, target: TargetType) -> Result<Option<Value>> {
    section
        .get(name)
        .map(|v| TemplateResolver::process().resolve(v, target))
        .transpose()
}

fn mismatch(section: &Section, name: &str, expected: &str, found: &Value) -> ConfigError {
    ConfigError::TypeMismatch(format!(
        "{} {}: attribute {} is {}, expected {}",
        section.kind(),
        section.id(),
        name,
        found.type_name(),
        expected
    ))
}

pub(crate) fn resolved_str(section: &Section, name: &str) -> Result<Option<String>> {
    match resolved(section, name, TargetType::Str)? {
        None => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s)),
        Some(other) => Err(mismatch(section, name, "str", &other)),
    }
}

pub(crate) fn resolved_int(section: &Section, name: &str) -> Result<Option<i64>> {
    match resolved(section, name, TargetType::Int)? {
        None => Ok(None),
        Some(Value::Int(i)) => Ok(Some(i)),
        Some(other) => Err(mismatch(section, name, "int", &other)),
    }
}

pub(crate) fn resolved_scope(section: &Section, name: &str) -> Result<Option<Scope>> {
    match resolved(section, name, TargetType::Str)? {
        None => Ok(None),
        Some(Value::Scope(scope)) => Ok(Some(scope)),
        Some(Value::Str(s)) => Scope::from_name(&s)
            .map(Some)
            .ok_or_else(|| mismatch(section, name, "scope", &Value::Str(s))),
        Some(other) => Err(mismatch(section, name, "scope", &other)),
    }
}

pub(crate) fn resolved_frequency(section: &Section, name: &str) -> Result<Option<Frequency>> {
    match resolved(section, name, TargetType::Str)? {
        None => Ok(None),
        Some(Value::Frequency(freq)) => Ok(Some(freq)),
        Some(Value::Str(s)) => Frequency::from_name(&s)
            .map(Some)
            .ok_or_else(|| mismatch(section, name, "frequency", &Value::Str(s))),
        Some(other) => Err(mismatch(section, name, "frequency", &other)),
    }
}

/// Ids held by a list of entity references. A single reference counts as a
/// one-element list; an unset attribute is an empty one.
pub(crate) fn referenced_ids(section: &Section, name: &str) -> Result<Vec<String>> {
    let id_of = |v: &Value| match v {
        Value::Section(id) | Value::Str(id) => Ok(id.clone()),
        other => Err(mismatch(section, name, "section reference", other)),
    };
    match section.get(name) {
        None => Ok(Vec::new()),
        Some(Value::List(items)) => items.iter().map(id_of).collect(),
        Some(single) => Ok(vec![id_of(single)?]),
    }
}

/// Attributes other than the kind's fixed fields, templates resolved.
pub(crate) fn extra_properties(section: &Section, fixed: &[&str]) -> Result<AttrMap> {
    let resolver = TemplateResolver::process();
    section
        .attributes()
        .iter()
        .filter(|(k, _)| !fixed.contains(&k.as_str()))
        .map(|(k, v)| -> Result<(String, Value)> {
            Ok((k.clone(), resolver.resolve(v, TargetType::Any)?))
        })
        .collect()
}

/// Entity references for a list of ids.
pub(crate) fn section_refs(ids: &[&str]) -> Value {
    Value::List(ids.iter().map(|id| Value::Section(id.to_string())).collect())
}

pub(crate) fn insert_opt(attributes: &mut AttrMap, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        attributes.insert(key.to_string(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;

    #[test]
    fn test_builtin_defaults() {
        let defaults = builtin_defaults();
        let kinds: Vec<&str> = defaults.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec!["GLOBAL", "JOB", "DATA_NODE", "TASK", "PIPELINE", "SCENARIO"]
        );
    }

    #[test]
    fn test_referenced_ids() {
        let section = Section::collection(
            "PIPELINE",
            "p",
            attrs! {"tasks" => section_refs(&["t1", "t2"]), "single" => Value::Section("t3".into())},
        )
        .unwrap();
        assert_eq!(referenced_ids(&section, "tasks").unwrap(), vec!["t1", "t2"]);
        assert_eq!(referenced_ids(&section, "single").unwrap(), vec!["t3"]);
        assert!(referenced_ids(&section, "missing").unwrap().is_empty());
    }

    #[test]
    fn test_resolved_scope_from_name() {
        let section = Section::collection("DATA_NODE", "dn", attrs! {"scope" => "CYCLE"}).unwrap();
        assert_eq!(resolved_scope(&section, "scope").unwrap(), Some(Scope::Cycle));
    }

    #[test]
    fn test_type_mismatch_on_wrong_variant() {
        let section = Section::collection("DATA_NODE", "dn", attrs! {"storage_type" => 3}).unwrap();
        assert!(matches!(
            resolved_str(&section, "storage_type"),
            Err(ConfigError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_extra_properties() {
        let section = Section::collection(
            "DATA_NODE",
            "dn",
            attrs! {"storage_type" => "csv", "path" => "a.csv"},
        )
        .unwrap();
        assert_eq!(
            extra_properties(&section, &["storage_type"]).unwrap(),
            attrs! {"path" => "a.csv"}
        );
    }
}
