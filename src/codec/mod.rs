//! Type-tagged codec.
//!
//! Text formats only carry strings, numbers, booleans, lists and tables, so
//! every richer value is written as a string with a `payload:TAG` suffix:
//!
//! | Value | Written as |
//! |---|---|
//! | `Bool(true)` | `"True:bool"` |
//! | `Int(3)` | `"3:int"` |
//! | `Float(3.0)` | `"3.0:float"` |
//! | `Scope::Scenario` | `"SCENARIO:SCOPE"` |
//! | `Frequency::Daily` | `"DAILY:FREQUENCY"` |
//! | `Section("dn1")` | `"dn1:SECTION"` |
//! | `Function("app.run")` | `"app.run:function"` |
//! | `Class("app.Model")` | `"app.Model:class"` |
//!
//! Plain strings and `ENV[NAME]` templates are written bare. A plain string
//! that would read back as tagged (its text after the last `:` is an
//! identifier) is escaped with the `str` tag instead. Reading an unknown tag
//! is a loading error.
//!
//! A written document starts with a `unique-kinds` list naming its unique
//! kinds, so a reader that has not registered them does not take a unique
//! table made only of tables (or an empty one) for a collection.

pub mod callables;
pub mod format;

pub use callables::{Callable, CallableKind, CallableRegistry};
pub use format::SerializerFormat;

use crate::config::registry::SectionRegistry;
use crate::config::section::{GLOBAL_KIND, KindNature, Section, validate_id};
use crate::config::snapshot::Snapshot;
use crate::error::{ConfigError, Result};
use crate::template::{is_template, parse_bool, parse_float, parse_int};
use crate::types::{AttrMap, Frequency, Scope, Value};
use format::json_type_name;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;
use tracing::debug;

/// Top-level key listing the unique kinds of a written document. It is not
/// a valid kind name, so it never collides with one.
pub const UNIQUE_KINDS_KEY: &str = "unique-kinds";

/// Split `payload:TAG` when TAG is an identifier and the payload is not empty.
fn split_tag(s: &str) -> Option<(&str, &str)> {
    let (payload, tag) = s.rsplit_once(':')?;
    let mut chars = tag.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if payload.is_empty() || !head_ok || !tail_ok {
        return None;
    }
    Some((payload, tag))
}

/// Encode one value.
pub fn stringify(value: &Value) -> JsonValue {
    match value {
        Value::Str(s) => {
            if !is_template(s) && split_tag(s).is_some() {
                JsonValue::String(format!("{}:str", s))
            } else {
                JsonValue::String(s.clone())
            }
        }
        Value::Bool(b) => {
            JsonValue::String(format!("{}:bool", if *b { "True" } else { "False" }))
        }
        Value::Int(i) => JsonValue::String(format!("{}:int", i)),
        Value::Float(x) => JsonValue::String(format!("{:?}:float", x)),
        Value::Scope(scope) => JsonValue::String(format!("{}:SCOPE", scope.name())),
        Value::Frequency(freq) => JsonValue::String(format!("{}:FREQUENCY", freq.name())),
        Value::Section(id) => JsonValue::String(format!("{}:SECTION", id)),
        Value::Function(path) => JsonValue::String(format!("{}:function", path)),
        Value::Class(path) => JsonValue::String(format!("{}:class", path)),
        Value::List(items) => JsonValue::Array(items.iter().map(stringify).collect()),
        Value::Map(map) => JsonValue::Object(stringify_attributes(map)),
    }
}

/// Encode an attribute map, keeping its order.
pub fn stringify_attributes(attributes: &AttrMap) -> Map<String, JsonValue> {
    attributes
        .iter()
        .map(|(k, v)| (k.clone(), stringify(v)))
        .collect()
}

/// Decode one value.
pub fn parse(tagged: &JsonValue, callables: &CallableRegistry) -> Result<Value> {
    match tagged {
        JsonValue::String(s) => parse_string(s, callables),
        JsonValue::Bool(b) => Ok(Value::Bool(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Int(i)),
            None => n
                .as_f64()
                .map(Value::Float)
                .ok_or_else(|| ConfigError::loading(format!("number {} is out of range", n))),
        },
        JsonValue::Array(items) => items
            .iter()
            .map(|item| parse(item, callables))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        JsonValue::Object(map) => parse_attributes(map, callables).map(Value::Map),
        JsonValue::Null => Err(ConfigError::loading("null values are not supported")),
    }
}

/// Decode an attribute map, keeping its order.
pub fn parse_attributes(
    map: &Map<String, JsonValue>,
    callables: &CallableRegistry,
) -> Result<AttrMap> {
    map.iter()
        .map(|(k, v)| -> Result<(String, Value)> { Ok((k.clone(), parse(v, callables)?)) })
        .collect()
}

fn parse_string(s: &str, callables: &CallableRegistry) -> Result<Value> {
    if is_template(s) {
        return Ok(Value::Str(s.to_string()));
    }
    let Some((payload, tag)) = split_tag(s) else {
        return Ok(Value::Str(s.to_string()));
    };

    let invalid = || ConfigError::loading(format!("'{}' is not a valid {} value", payload, tag));
    match tag {
        "str" => Ok(Value::Str(payload.to_string())),
        "bool" => parse_bool(payload).map(Value::Bool).ok_or_else(invalid),
        "int" => parse_int(payload).map(Value::Int).ok_or_else(invalid),
        "float" => parse_float(payload).map(Value::Float).ok_or_else(invalid),
        "SCOPE" => Scope::from_name(payload).map(Value::Scope).ok_or_else(invalid),
        "FREQUENCY" => Frequency::from_name(payload)
            .map(Value::Frequency)
            .ok_or_else(invalid),
        "SECTION" => Ok(Value::Section(payload.to_string())),
        "function" => {
            callables.check(CallableKind::Function, payload)?;
            Ok(Value::Function(payload.to_string()))
        }
        "class" => {
            callables.check(CallableKind::Class, payload)?;
            Ok(Value::Class(payload.to_string()))
        }
        unknown => Err(ConfigError::loading(format!(
            "unknown type tag '{}' in '{}'",
            unknown, s
        ))),
    }
}

/// Encode a whole snapshot as `kind → [id →] attribute → value`, the
/// global-app entity first, then unique kinds, then collection kinds.
pub fn snapshot_to_tree(snapshot: &Snapshot) -> JsonValue {
    JsonValue::Object(snapshot_tables(snapshot))
}

fn snapshot_tables(snapshot: &Snapshot) -> Map<String, JsonValue> {
    let mut root = Map::new();
    root.insert(
        GLOBAL_KIND.to_string(),
        JsonValue::Object(stringify_attributes(snapshot.global().attributes())),
    );
    for (kind, section) in snapshot.unique_sections() {
        root.insert(
            kind.clone(),
            JsonValue::Object(stringify_attributes(section.attributes())),
        );
    }
    for (kind, sections) in snapshot.collections() {
        let entities: Map<String, JsonValue> = sections
            .iter()
            .map(|(id, section)| {
                (
                    id.clone(),
                    JsonValue::Object(stringify_attributes(section.attributes())),
                )
            })
            .collect();
        root.insert(kind.clone(), JsonValue::Object(entities));
    }
    root
}

/// Whether `body` reads as a collection: every child is a table.
fn reads_as_collection(body: &Map<String, JsonValue>) -> bool {
    body.values().all(|v| v.is_object())
}

/// Nature of `kind` in a document: its registered nature, then the
/// document's own `unique-kinds` list, then an earlier guess the table still
/// fits, then the shape of the table.
fn resolve_nature(
    kind: &str,
    body: &Map<String, JsonValue>,
    registry: &SectionRegistry,
    declared_unique: &HashSet<&str>,
) -> KindNature {
    if let Some(nature) = registry.declared(kind) {
        return nature;
    }
    if declared_unique.contains(kind) {
        return KindNature::Unique;
    }
    let shape_fits = |nature: &KindNature| {
        *nature == KindNature::Unique || reads_as_collection(body)
    };
    if let Some(guessed) = registry.nature(kind).filter(shape_fits) {
        return guessed;
    }
    let inferred = if reads_as_collection(body) {
        KindNature::Collection
    } else {
        KindNature::Unique
    };
    debug!(kind = %kind, nature = %inferred, "Inferred nature of unregistered kind");
    inferred
}

/// Kind names listed under [`UNIQUE_KINDS_KEY`].
fn declared_unique_kinds(root: &Map<String, JsonValue>) -> Result<HashSet<&str>> {
    let Some(listed) = root.get(UNIQUE_KINDS_KEY) else {
        return Ok(HashSet::new());
    };
    let invalid = || {
        ConfigError::loading(format!(
            "{} must be a list of kind names, found {}",
            UNIQUE_KINDS_KEY,
            json_type_name(listed)
        ))
    };
    listed
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|kind| kind.as_str().ok_or_else(invalid))
        .collect()
}

/// Decode a tree produced by [`snapshot_to_tree`] or [`encode`].
///
/// Kinds missing from `registry` take their nature from the document's
/// `unique-kinds` list, or from the shape of their table.
pub fn snapshot_from_tree(
    tree: &JsonValue,
    registry: &SectionRegistry,
    callables: &CallableRegistry,
) -> Result<Snapshot> {
    let root = tree.as_object().ok_or_else(|| {
        ConfigError::loading(format!(
            "expected a table at the document root, found {}",
            json_type_name(tree)
        ))
    })?;

    let declared_unique = declared_unique_kinds(root)?;
    let mut snapshot = Snapshot::empty();
    for (kind, body) in root {
        if kind == UNIQUE_KINDS_KEY {
            continue;
        }
        let body = body.as_object().ok_or_else(|| {
            ConfigError::loading(format!(
                "section {} must be a table, found {}",
                kind,
                json_type_name(body)
            ))
        })?;

        if kind == GLOBAL_KIND {
            snapshot.put(Section::global(parse_attributes(body, callables)?));
            continue;
        }

        validate_id(kind)?;
        let nature = resolve_nature(kind, body, registry, &declared_unique);

        match nature {
            KindNature::Unique => {
                snapshot.put(Section::unique(kind, parse_attributes(body, callables)?)?);
            }
            KindNature::Collection => {
                snapshot.ensure_collection(kind);
                for (id, entity) in body {
                    let entity = entity.as_object().ok_or_else(|| {
                        ConfigError::loading(format!(
                            "entity {}.{} must be a table, found {}",
                            kind,
                            id,
                            json_type_name(entity)
                        ))
                    })?;
                    snapshot.put(Section::collection(
                        kind,
                        id,
                        parse_attributes(entity, callables)?,
                    )?);
                }
            }
        }
    }
    Ok(snapshot)
}

/// The written form of a snapshot: [`snapshot_to_tree`] preceded by the
/// `unique-kinds` list when the snapshot has unique kinds.
pub fn snapshot_to_document(snapshot: &Snapshot) -> JsonValue {
    let tree = snapshot_tables(snapshot);
    let unique: Vec<JsonValue> = snapshot
        .unique_sections()
        .keys()
        .map(|kind| JsonValue::String(kind.clone()))
        .collect();
    if unique.is_empty() {
        return JsonValue::Object(tree);
    }
    let mut document = Map::new();
    document.insert(UNIQUE_KINDS_KEY.to_string(), JsonValue::Array(unique));
    document.extend(tree);
    JsonValue::Object(document)
}

/// Render a snapshot in `format`.
pub fn encode(snapshot: &Snapshot, format: SerializerFormat) -> Result<String> {
    format.dump(&snapshot_to_document(snapshot))
}

/// Read a snapshot from text in `format`.
pub fn decode(
    text: &str,
    format: SerializerFormat,
    registry: &SectionRegistry,
    callables: &CallableRegistry,
) -> Result<Snapshot> {
    let tree = format.load(text)?;
    snapshot_from_tree(&tree, registry, callables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs;
    use serde_json::json;

    fn lenient() -> CallableRegistry {
        CallableRegistry::lenient()
    }

    #[test]
    fn test_stringify_scalars() {
        assert_eq!(stringify(&Value::Bool(true)), json!("True:bool"));
        assert_eq!(stringify(&Value::Bool(false)), json!("False:bool"));
        assert_eq!(stringify(&Value::Int(-4)), json!("-4:int"));
        assert_eq!(stringify(&Value::Float(3.0)), json!("3.0:float"));
        assert_eq!(stringify(&Value::Scope(Scope::Cycle)), json!("CYCLE:SCOPE"));
        assert_eq!(
            stringify(&Value::Frequency(Frequency::Weekly)),
            json!("WEEKLY:FREQUENCY")
        );
        assert_eq!(stringify(&Value::Section("dn1".into())), json!("dn1:SECTION"));
        assert_eq!(
            stringify(&Value::Function("app.algo.train".into())),
            json!("app.algo.train:function")
        );
        assert_eq!(stringify(&Value::Class("app.Model".into())), json!("app.Model:class"));
    }

    #[test]
    fn test_plain_and_template_strings_stay_bare() {
        assert_eq!(stringify(&Value::from("hello")), json!("hello"));
        assert_eq!(stringify(&Value::from("ENV[FOO]")), json!("ENV[FOO]"));
        assert_eq!(stringify(&Value::from("ENV[FOO]:int")), json!("ENV[FOO]:int"));
        assert_eq!(stringify(&Value::from("http://host/x")), json!("http://host/x"));
        assert_eq!(stringify(&Value::from("12:30")), json!("12:30"));
    }

    #[test]
    fn test_tag_like_strings_are_escaped() {
        assert_eq!(stringify(&Value::from("a:b")), json!("a:b:str"));
        assert_eq!(stringify(&Value::from("3:int")), json!("3:int:str"));
        assert_eq!(
            parse(&json!("3:int:str"), &lenient()).unwrap(),
            Value::from("3:int")
        );
    }

    #[test]
    fn test_parse_tags() {
        let c = lenient();
        assert_eq!(parse(&json!("True:bool"), &c).unwrap(), Value::Bool(true));
        assert_eq!(parse(&json!("17:int"), &c).unwrap(), Value::Int(17));
        assert_eq!(parse(&json!("2.5:float"), &c).unwrap(), Value::Float(2.5));
        assert_eq!(
            parse(&json!("PIPELINE:SCOPE"), &c).unwrap(),
            Value::Scope(Scope::Pipeline)
        );
        assert_eq!(
            parse(&json!("dn1:SECTION"), &c).unwrap(),
            Value::Section("dn1".into())
        );
        assert_eq!(
            parse(&json!("ENV[QUX]:bool"), &c).unwrap(),
            Value::from("ENV[QUX]:bool")
        );
    }

    #[test]
    fn test_parse_native_scalars() {
        let c = lenient();
        assert_eq!(parse(&json!(3), &c).unwrap(), Value::Int(3));
        assert_eq!(parse(&json!(1.5), &c).unwrap(), Value::Float(1.5));
        assert_eq!(parse(&json!(true), &c).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_unknown_tag_is_loading_error() {
        let err = parse(&json!("1:decimal"), &lenient()).unwrap_err();
        assert!(matches!(err, ConfigError::Loading(_)));
    }

    #[test]
    fn test_bad_payload_is_loading_error() {
        assert!(matches!(
            parse(&json!("maybe:bool"), &lenient()),
            Err(ConfigError::Loading(_))
        ));
        assert!(matches!(
            parse(&json!("HOURLY:FREQUENCY"), &lenient()),
            Err(ConfigError::Loading(_))
        ));
    }

    #[test]
    fn test_strict_callables() {
        let strict = CallableRegistry::new();
        let err = parse(&json!("app.run:function"), &strict).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedCallable { .. }));
    }

    #[test]
    fn test_value_round_trip() {
        let value = Value::Map(attrs! {
            "list" => vec![Value::Int(1), Value::from("x"), Value::Bool(false)],
            "nested" => attrs! {"f" => 0.1, "s" => Scope::Global},
            "escaped" => "k:v",
        });
        assert_eq!(parse(&stringify(&value), &lenient()).unwrap(), value);
    }

    #[test]
    fn test_snapshot_tree_layout() {
        let mut snapshot = Snapshot::empty();
        snapshot.put(Section::global(attrs! {"root_folder" => "./x/"}));
        snapshot.put(Section::unique("JOB", attrs! {"mode" => "standalone"}).unwrap());
        snapshot.put(
            Section::collection("DATA_NODE", "dn1", attrs! {"scope" => Scope::Scenario}).unwrap(),
        );

        let tree = snapshot_to_tree(&snapshot);
        assert_eq!(
            tree,
            json!({
                "GLOBAL": {"root_folder": "./x/"},
                "JOB": {"mode": "standalone"},
                "DATA_NODE": {"dn1": {"scope": "SCENARIO:SCOPE"}}
            })
        );
        let keys: Vec<&String> = tree.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["GLOBAL", "JOB", "DATA_NODE"]);
    }

    #[test]
    fn test_snapshot_round_trip_with_inference() {
        let mut snapshot = Snapshot::empty();
        snapshot.put(Section::unique("JOB", attrs! {"mode" => "standalone", "n" => 2}).unwrap());
        snapshot.put(Section::collection("TASK", "t1", attrs! {"inputs" => vec![Value::Section("a".into())]}).unwrap());

        let text = encode(&snapshot, SerializerFormat::Toml).unwrap();
        let back = decode(
            &text,
            SerializerFormat::Toml,
            &SectionRegistry::new(),
            &lenient(),
        )
        .unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_registry_overrides_inference() {
        let mut registry = SectionRegistry::new();
        registry.register("PROPS", KindNature::Unique).unwrap();
        let tree = json!({"PROPS": {"inner": {"a": "1:int"}}});
        let snapshot = snapshot_from_tree(&tree, &registry, &lenient()).unwrap();
        let props = snapshot.unique("PROPS").unwrap();
        assert_eq!(
            props.get("inner"),
            Some(&Value::Map(attrs! {"a" => 1}))
        );
    }

    #[test]
    fn test_document_lists_unique_kinds_first() {
        let mut snapshot = Snapshot::empty();
        snapshot.put(Section::unique("PROPS", attrs! {"limits" => attrs! {"max" => 1}}).unwrap());
        snapshot.put(Section::unique("EMPTY", attrs! {}).unwrap());
        snapshot.ensure_collection("SOURCES");

        let document = snapshot_to_document(&snapshot);
        let keys: Vec<&String> = document.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec![UNIQUE_KINDS_KEY, "GLOBAL", "PROPS", "EMPTY", "SOURCES"]);
        assert_eq!(document[UNIQUE_KINDS_KEY], json!(["PROPS", "EMPTY"]));
        assert!(snapshot_to_tree(&snapshot).get(UNIQUE_KINDS_KEY).is_none());

        for format in [SerializerFormat::Toml, SerializerFormat::Json, SerializerFormat::Yaml] {
            let text = encode(&snapshot, format).unwrap();
            let back = decode(&text, format, &SectionRegistry::new(), &lenient()).unwrap();
            assert_eq!(back, snapshot, "{} round trip", format);
        }
    }

    #[test]
    fn test_guessed_nature_kept_while_the_table_fits() {
        let mut registry = SectionRegistry::new();
        registry.infer("PROPS", KindNature::Unique).unwrap();
        let tree = json!({"PROPS": {"limits": {"max": "3:int"}}});
        let snapshot = snapshot_from_tree(&tree, &registry, &lenient()).unwrap();
        assert!(snapshot.unique("PROPS").is_some());

        let mut registry = SectionRegistry::new();
        registry.infer("LIMITS", KindNature::Collection).unwrap();
        let tree = json!({"LIMITS": {"rate": "10:int"}});
        let snapshot = snapshot_from_tree(&tree, &registry, &lenient()).unwrap();
        assert_eq!(snapshot.unique("LIMITS").unwrap().get("rate"), Some(&Value::Int(10)));
    }

    #[test]
    fn test_malformed_unique_kinds_is_loading_error() {
        let tree = json!({UNIQUE_KINDS_KEY: "PROPS"});
        assert!(matches!(
            snapshot_from_tree(&tree, &SectionRegistry::new(), &lenient()),
            Err(ConfigError::Loading(_))
        ));
        let tree = json!({UNIQUE_KINDS_KEY: [1]});
        assert!(matches!(
            snapshot_from_tree(&tree, &SectionRegistry::new(), &lenient()),
            Err(ConfigError::Loading(_))
        ));
    }

    #[test]
    fn test_invalid_entity_id_rejected() {
        let tree = json!({"DATA_NODE": {"bad-id": {}}});
        let err = snapshot_from_tree(&tree, &SectionRegistry::new(), &lenient()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidConfigurationId(_)));
    }

    #[test]
    fn test_collection_entity_must_be_table() {
        let mut registry = SectionRegistry::new();
        registry.register("DATA_NODE", KindNature::Collection).unwrap();
        let tree = json!({"DATA_NODE": {"dn1": "oops"}});
        let err = snapshot_from_tree(&tree, &registry, &lenient()).unwrap_err();
        assert!(matches!(err, ConfigError::Loading(_)));
    }
}
