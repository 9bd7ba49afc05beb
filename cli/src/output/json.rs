//! JSON output helpers.
//!
//! Every successful `--json` code path prints exactly one pretty-printed JSON
//! document on stdout. Errors that stop a command before it has a result
//! leave stdout empty and go to stderr like any other run.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::{BatchResult, MachineState, SchemaRegistry};

/// Renders domain types as JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &impl Serialize) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    /// Render a finished batch.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_batch_result(result: &BatchResult) -> Result<()> {
        Self::print(result)
    }

    /// Render a state query: `{"machine_id", "found", "state"}`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_state(machine_id: &str, state: &MachineState) -> Result<()> {
        Self::print(&state_document(machine_id, state))
    }

    /// Render the command catalog: `{"machine", "commands"}`.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_catalog(registry: &SchemaRegistry) -> Result<()> {
        let commands: Vec<_> = registry.commands().collect();
        Self::print(&serde_json::json!({
            "machine": registry.machine(),
            "commands": commands,
        }))
    }
}

/// JSON document describing a state query result.
#[must_use]
pub fn state_document(machine_id: &str, state: &MachineState) -> serde_json::Value {
    serde_json::json!({
        "machine_id": machine_id,
        "found": !state.is_absent(),
        "state": state.record(),
    })
}
