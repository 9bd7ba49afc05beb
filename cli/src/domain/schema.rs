//! Static command catalog for one machine type.
//!
//! The catalog is hand-authored JSON shipped alongside the machine driver.
//! It is the only source of truth for which commands exist and which
//! parameters they take; nothing is discovered at runtime.

use std::collections::BTreeMap;

use puda_common::CommandRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::SchemaError;

/// JSON type accepted for a parameter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    #[default]
    Any,
}

impl ParamType {
    /// Whether `value` is acceptable for this type. Integers satisfy `number`.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One parameter of a command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: ParamType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// One command a machine accepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandSchema {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

/// Catalog file as written on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub machine: Option<String>,
    pub commands: Vec<CommandSchema>,
}

/// Lookup table of command schemas, keyed by command name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    machine: Option<String>,
    commands: BTreeMap<String, CommandSchema>,
}

impl SchemaRegistry {
    /// Build a registry from a parsed catalog file. Later duplicates win.
    #[must_use]
    pub fn from_catalog(catalog: CatalogFile) -> Self {
        let commands = catalog
            .commands
            .into_iter()
            .map(|c| (c.name.clone(), c))
            .collect();
        Self {
            machine: catalog.machine,
            commands,
        }
    }

    /// Parse a catalog from JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid catalog.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<CatalogFile>(json).map(Self::from_catalog)
    }

    #[must_use]
    pub fn machine(&self) -> Option<&str> {
        self.machine.as_deref()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandSchema> {
        self.commands.get(name)
    }

    /// Commands in name order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandSchema> {
        self.commands.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Check a request against its command schema.
    ///
    /// # Errors
    ///
    /// Returns the first mismatch found: unknown command, unknown parameter,
    /// missing required parameter, or a value of the wrong type.
    pub fn validate(&self, request: &CommandRequest) -> Result<(), SchemaError> {
        let schema = self
            .get(request.name())
            .ok_or_else(|| SchemaError::UnknownCommand(request.name().to_string()))?;

        for (param, value) in request.params() {
            let Some(spec) = schema.params.iter().find(|p| &p.name == param) else {
                return Err(SchemaError::UnknownParam {
                    command: schema.name.clone(),
                    param: param.clone(),
                });
            };
            if value.is_null() && !spec.required {
                continue;
            }
            if !spec.kind.accepts(value) {
                return Err(SchemaError::TypeMismatch {
                    command: schema.name.clone(),
                    param: param.clone(),
                    expected: spec.kind.as_str().to_string(),
                    actual: json_type_name(value).to_string(),
                });
            }
        }

        if let Some(missing) = schema
            .params
            .iter()
            .find(|p| p.required && !request.params().contains_key(&p.name))
        {
            return Err(SchemaError::MissingParam {
                command: schema.name.clone(),
                param: missing.name.clone(),
            });
        }
        Ok(())
    }
}
