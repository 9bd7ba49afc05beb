//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::domain::{BatchResult, MachineState, SchemaRegistry};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        self.ctx.info(&format!("puda v{version}"));
    }

    /// Render a finished batch: summary, failure details, last response data.
    pub fn render_batch_result(&self, result: &BatchResult) {
        self.ctx.kv("Run ID:", result.run_id.as_str());
        self.ctx
            .kv("Sent:", &format!("{}/{}", result.sent, result.total));

        match (&result.failed_at, &result.failure) {
            (Some(at), Some(failure)) => {
                self.ctx
                    .error(&format!("Batch failed at command {at}: {failure}"));
            }
            _ => self.ctx.success("Batch commands completed successfully"),
        }

        if let Some(data) = result.last_response.as_ref().and_then(|r| r.data.as_ref()) {
            self.ctx.kv("Response data:", &data.to_string());
        }
    }

    /// Render a state query result.
    ///
    /// The record itself is printed as pretty JSON on stdout even when quiet,
    /// since it is the command's payload.
    pub fn render_state(&self, machine_id: &str, state: &MachineState) {
        match state {
            MachineState::Present(record) => {
                self.ctx.header(&format!("State of {machine_id}"));
                let pretty = serde_json::to_string_pretty(record)
                    .unwrap_or_else(|_| serde_json::Value::Object(record.clone()).to_string());
                println!("{pretty}");
            }
            MachineState::Absent => {
                self.ctx
                    .warn(&format!("No state has been published for {machine_id}"));
            }
        }
    }

    /// Render the command catalog as an indented listing.
    pub fn render_catalog(&self, registry: &SchemaRegistry) {
        if registry.is_empty() {
            self.ctx.info("Catalog contains no commands.");
            return;
        }
        if let Some(machine) = registry.machine() {
            self.ctx.header(&format!("Commands for {machine}"));
        }
        for command in registry.commands() {
            println!("  {}", command.name.style(self.ctx.styles.bold));
            if !command.description.is_empty() {
                println!("    {}", command.description.style(self.ctx.styles.dim));
            }
            for param in &command.params {
                let required = if param.required { "required" } else { "optional" };
                let default = param
                    .default
                    .as_ref()
                    .map(|d| format!(" (default: {d})"))
                    .unwrap_or_default();
                println!(
                    "    {:<20} {:<8} {required}{default}",
                    param.name,
                    param.kind.as_str()
                );
            }
        }
    }
}
