//! Turning loaded command specifications into validated requests.

use puda_common::{CommandRequest, RawCommand, validate_machine_id};
use serde_json::Value;

use crate::domain::error::ValidationError;
use crate::domain::schema::SchemaRegistry;

/// Who is sending commands, and to which machine.
///
/// All three strings are opaque and passed through unmodified; only
/// non-emptiness (and subject safety for the machine id) is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    pub machine_id: String,
    pub user_id: String,
    pub username: String,
}

impl Attribution {
    #[must_use]
    pub fn new(
        machine_id: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            machine_id: machine_id.into(),
            user_id: user_id.into(),
            username: username.into(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if any field is blank or the machine id is unusable
    /// as a subject segment.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.trim().is_empty() {
            return Err(ValidationError::MissingAttribution { field: "user_id" });
        }
        if self.username.trim().is_empty() {
            return Err(ValidationError::MissingAttribution { field: "username" });
        }
        validate_machine_id(&self.machine_id).map_err(|reason| {
            ValidationError::InvalidMachineId {
                machine_id: self.machine_id.clone(),
                reason: reason.to_string(),
            }
        })
    }
}

/// Build requests from raw specs, checking each one structurally and, when a
/// registry is given, against the machine's command schema.
///
/// Indices in errors are 1-based, matching the position in the input file.
///
/// # Errors
///
/// Returns the first invalid entry, or `EmptyBatch` for an empty input.
pub fn prepare_batch(
    specs: Vec<Value>,
    schema: Option<&SchemaRegistry>,
) -> Result<Vec<CommandRequest>, ValidationError> {
    if specs.is_empty() {
        return Err(ValidationError::EmptyBatch);
    }
    specs
        .into_iter()
        .enumerate()
        .map(|(i, spec)| {
            let index = i + 1;
            let raw: RawCommand =
                serde_json::from_value(spec).map_err(|e| ValidationError::InvalidCommand {
                    index,
                    reason: e.to_string(),
                })?;
            let request = CommandRequest::try_from(raw).map_err(|e| ValidationError::at(index, &e))?;
            if let Some(registry) = schema {
                registry
                    .validate(&request)
                    .map_err(|e| ValidationError::InvalidCommand {
                        index,
                        reason: e.to_string(),
                    })?;
            }
            Ok(request)
        })
        .collect()
}
