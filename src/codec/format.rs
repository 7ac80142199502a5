//! Surface syntaxes for the tagged tree.

use crate::error::{ConfigError, Result};
use serde_json::Value as JsonValue;
use std::path::Path;

/// Text format a configuration is written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SerializerFormat {
    #[default]
    Toml,
    Json,
    Yaml,
}

impl SerializerFormat {
    /// Parse a format identifier. Unknown identifiers are rejected.
    pub fn from_identifier(id: &str) -> Result<Self> {
        match id.to_lowercase().as_str() {
            "toml" => Ok(SerializerFormat::Toml),
            "json" => Ok(SerializerFormat::Json),
            "yaml" | "yml" => Ok(SerializerFormat::Yaml),
            _ => Err(ConfigError::UnknownSerializer(id.to_string())),
        }
    }

    /// Infer the format from a file extension, TOML when in doubt.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("json") => SerializerFormat::Json,
            Some("yaml") | Some("yml") => SerializerFormat::Yaml,
            _ => SerializerFormat::Toml,
        }
    }

    pub fn identifier(&self) -> &'static str {
        match self {
            SerializerFormat::Toml => "toml",
            SerializerFormat::Json => "json",
            SerializerFormat::Yaml => "yaml",
        }
    }

    /// Render a tagged tree.
    pub fn dump(&self, tree: &JsonValue) -> Result<String> {
        match self {
            SerializerFormat::Toml => toml::to_string_pretty(tree)
                .map_err(|e| ConfigError::loading(format!("TOML serialization failed: {}", e))),
            SerializerFormat::Json => serde_json::to_string_pretty(tree)
                .map_err(|e| ConfigError::loading(format!("JSON serialization failed: {}", e))),
            SerializerFormat::Yaml => serde_yaml::to_string(tree)
                .map_err(|e| ConfigError::loading(format!("YAML serialization failed: {}", e))),
        }
    }

    /// Parse text into a tagged tree. The root must be a table.
    pub fn load(&self, text: &str) -> Result<JsonValue> {
        let tree: JsonValue = match self {
            SerializerFormat::Toml => {
                toml::from_str(text).map_err(|e| ConfigError::loading(e.to_string()))?
            }
            SerializerFormat::Json => {
                serde_json::from_str(text).map_err(|e| ConfigError::loading(e.to_string()))?
            }
            SerializerFormat::Yaml => {
                serde_yaml::from_str(text).map_err(|e| ConfigError::loading(e.to_string()))?
            }
        };
        match tree {
            JsonValue::Object(_) => Ok(tree),
            // an empty YAML document
            JsonValue::Null => Ok(JsonValue::Object(serde_json::Map::new())),
            other => Err(ConfigError::loading(format!(
                "expected a table at the document root, found {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl std::str::FromStr for SerializerFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SerializerFormat::from_identifier(s).map_err(|_| {
            format!(
                "Invalid format '{}'. Valid options: toml, json, yaml",
                s
            )
        })
    }
}

impl std::fmt::Display for SerializerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier())
    }
}

pub(crate) fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "table",
    }
}
