//! Template resolution for `ENV[NAME]` indirections.
//!
//! A stored string of the form `ENV[NAME]` (optionally `ENV[NAME]:TYPE`) is
//! looked up in the environment every time it is read. Nothing is cached, so
//! two reads separated by an environment change can observe different values.

use crate::error::{ConfigError, Result};
use crate::types::Value;
use regex_lite::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static TEMPLATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ENV\[([a-zA-Z_][a-zA-Z0-9_]*)\](?::(bool|str|float|int))?$")
        .expect("template pattern is valid")
});

const TRUE_TOKENS: &[&str] = &["true", "1", "t", "y", "yes", "yeah", "yup", "certainly", "uh-huh"];
const FALSE_TOKENS: &[&str] = &["false", "0", "f", "n", "no"];

/// Type requested by the reader of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetType {
    /// No preference: a `:TYPE` suffix on the template decides, else string.
    #[default]
    Any,
    Str,
    Bool,
    Int,
    Float,
}

impl TargetType {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "bool" => Some(TargetType::Bool),
            "str" => Some(TargetType::Str),
            "int" => Some(TargetType::Int),
            "float" => Some(TargetType::Float),
            _ => None,
        }
    }
}

/// A parsed `ENV[NAME]` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template<'a> {
    pub var: &'a str,
    pub forced: Option<TargetType>,
}

/// Parse `s` as an environment indirection.
pub fn parse_template(s: &str) -> Option<Template<'_>> {
    let caps = TEMPLATE_PATTERN.captures(s)?;
    let var = caps.get(1)?.as_str();
    let forced = caps.get(2).and_then(|m| TargetType::from_tag(m.as_str()));
    Some(Template { var, forced })
}

/// Whether `s` is an environment indirection.
pub fn is_template(s: &str) -> bool {
    TEMPLATE_PATTERN.is_match(s)
}

pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    let lowered = s.trim().to_lowercase();
    if TRUE_TOKENS.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSE_TOKENS.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse().ok()
}

pub(crate) fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse().ok()
}

/// Source of environment variables.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<T: EnvSource + ?Sized> EnvSource for &T {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Resolves stored values against an environment at read time.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateResolver<E = ProcessEnv> {
    env: E,
}

impl TemplateResolver<ProcessEnv> {
    /// Resolver backed by the process environment.
    pub fn process() -> Self {
        Self { env: ProcessEnv }
    }
}

impl<E: EnvSource> TemplateResolver<E> {
    pub fn new(env: E) -> Self {
        Self { env }
    }

    /// Resolve a required value. A missing variable is an error.
    pub fn resolve(&self, value: &Value, target: TargetType) -> Result<Value> {
        match self.resolve_opt(value, target, true, None)? {
            Some(v) => Ok(v),
            // required lookups never come back empty
            None => Ok(value.clone()),
        }
    }

    /// Resolve a value. When the variable is absent, a required reference
    /// fails and an optional one yields `default`.
    pub fn resolve_opt(
        &self,
        value: &Value,
        target: TargetType,
        required: bool,
        default: Option<&Value>,
    ) -> Result<Option<Value>> {
        match value {
            Value::Str(s) => match parse_template(s) {
                Some(template) => self.resolve_template(&template, target, required, default),
                None => Ok(Some(value.clone())),
            },
            Value::List(items) => {
                let resolved = items
                    .iter()
                    .map(|item| self.resolve(item, TargetType::Any))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(Value::List(resolved)))
            }
            Value::Map(map) => {
                let mut resolved = map.clone();
                for (_, v) in resolved.iter_mut() {
                    *v = self.resolve(v, TargetType::Any)?;
                }
                Ok(Some(Value::Map(resolved)))
            }
            other => Ok(Some(other.clone())),
        }
    }

    fn resolve_template(
        &self,
        template: &Template<'_>,
        target: TargetType,
        required: bool,
        default: Option<&Value>,
    ) -> Result<Option<Value>> {
        let Some(raw) = self.env.var(template.var) else {
            if required {
                return Err(ConfigError::inconsistent_env(
                    template.var,
                    "environment variable is not set",
                ));
            }
            return Ok(default.cloned());
        };

        // An explicitly requested type wins over the template's own suffix.
        let effective = match target {
            TargetType::Any => template.forced.unwrap_or(TargetType::Str),
            explicit => explicit,
        };

        let converted = match effective {
            TargetType::Any | TargetType::Str => Some(Value::Str(raw.clone())),
            TargetType::Bool => parse_bool(&raw).map(Value::Bool),
            TargetType::Int => parse_int(&raw).map(Value::Int),
            TargetType::Float => parse_float(&raw).map(Value::Float),
        };

        converted.map(Some).ok_or_else(|| {
            ConfigError::inconsistent_env(
                template.var,
                format!("value '{}' can not be converted to {:?}", raw, effective),
            )
        })
    }
}
