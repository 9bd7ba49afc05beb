//! Machine state as seen by the controller.

use puda_common::MachineStateRecord;
use serde_json::Value;

use crate::domain::error::StateError;

/// Result of a state query: either the published record or an explicit
/// marker that the machine has never published one.
#[derive(Debug, Clone, PartialEq)]
pub enum MachineState {
    Present(MachineStateRecord),
    Absent,
}

impl MachineState {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    #[must_use]
    pub fn record(&self) -> Option<&MachineStateRecord> {
        match self {
            Self::Present(record) => Some(record),
            Self::Absent => None,
        }
    }
}

/// Decode a stored state entry. Only JSON objects are valid records.
///
/// # Errors
///
/// Returns `StateError::Decode` if `raw` is not JSON or not an object.
pub fn decode_record(machine_id: &str, raw: &[u8]) -> Result<MachineStateRecord, StateError> {
    let decode_err = |reason: String| StateError::Decode {
        machine_id: machine_id.to_string(),
        reason,
    };
    match serde_json::from_slice::<Value>(raw).map_err(|e| decode_err(e.to_string()))? {
        Value::Object(record) => Ok(record),
        other => Err(decode_err(format!(
            "expected a JSON object, found {}",
            match other {
                Value::Null => "null",
                Value::Bool(_) => "a boolean",
                Value::Number(_) => "a number",
                Value::String(_) => "a string",
                Value::Array(_) => "an array",
                Value::Object(_) => "an object",
            }
        ))),
    }
}
