//! Loading batch command files from disk.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::domain::SchemaRegistry;

/// Read a JSON array of command specs from `path`.
///
/// Entries are returned unvalidated; `domain::prepare_batch` checks them.
///
/// # Errors
///
/// Returns an error if the file is missing, is not JSON, or is not an array.
pub fn load_commands(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        bail!("Commands file not found: {}", path.display());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("invalid JSON in commands file {}", path.display()))?;
    match value {
        Value::Array(commands) => Ok(commands),
        _ => bail!("Commands file must contain a JSON array"),
    }
}

/// Read a command catalog from `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid catalog.
pub fn load_schema(path: &Path) -> Result<SchemaRegistry> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    SchemaRegistry::from_json(&content)
        .with_context(|| format!("cannot parse command catalog {}", path.display()))
}
