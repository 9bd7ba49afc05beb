use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Version of the envelope format written by this crate
pub const PROTOCOL_VERSION: &str = "1.0";

/// Reason a command specification could not become a [`CommandRequest`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandSpecError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("command name '{0}' may only contain ASCII letters, digits and '_'")]
    InvalidName(String),

    #[error("params of '{0}' must be a JSON object")]
    ParamsNotObject(String),
}

/// Wire form of a command, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCommand {
    pub name: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
}

/// A single machine instruction: a name plus named parameters.
///
/// Only constructed through [`CommandRequest::new`] (deserialization goes
/// through the same checks), and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCommand")]
pub struct CommandRequest {
    name: String,
    params: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    step_number: Option<u32>,
}

impl CommandRequest {
    pub fn new(
        name: impl Into<String>,
        params: Map<String, Value>,
        step_number: Option<u32>,
    ) -> Result<Self, CommandSpecError> {
        let name = name.into();
        if name.is_empty() {
            return Err(CommandSpecError::EmptyName);
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CommandSpecError::InvalidName(name));
        }
        Ok(Self {
            name,
            params,
            step_number,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &Map<String, Value> {
        &self.params
    }

    #[must_use]
    pub fn step_number(&self) -> Option<u32> {
        self.step_number
    }
}

impl TryFrom<RawCommand> for CommandRequest {
    type Error = CommandSpecError;

    fn try_from(raw: RawCommand) -> Result<Self, Self::Error> {
        let params = match raw.params {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(CommandSpecError::ParamsNotObject(raw.name)),
        };
        Self::new(raw.name, params, raw.step_number)
    }
}

/// Terminal status reported by a machine for one command
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandResponseStatus {
    Success,
    Failure,
    Error,
    Cancelled,
    Timeout,
    /// Any terminal state this controller does not know by name
    #[serde(other)]
    Other,
}

impl CommandResponseStatus {
    #[must_use]
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl std::fmt::Display for CommandResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Error => "ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Timeout => "TIMEOUT",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// Outcome of one executed command, produced by the machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub status: CommandResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl CommandResponse {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: CommandResponseStatus::Success,
            message: None,
            data: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: CommandResponseStatus::Failure,
            message: Some(message.into()),
            data: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Kind of envelope on the wire
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Command,
    Response,
}

/// Routing, correlation and attribution metadata carried by every envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHeader {
    pub message_type: MessageType,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub username: String,
    pub machine_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    /// Correlation token; a reply repeats the token of its request.
    pub command_id: String,
    /// Subject the machine publishes the reply on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
}

/// Envelope published on command and reply subjects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub header: MessageHeader,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<CommandRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<CommandResponse>,
}

impl CommandEnvelope {
    /// Build the reply envelope a machine sends back for this command.
    #[must_use]
    pub fn reply(&self, response: CommandResponse) -> Self {
        Self {
            header: MessageHeader {
                message_type: MessageType::Response,
                timestamp: Utc::now(),
                reply_to: None,
                ..self.header.clone()
            },
            command: self.command.clone(),
            response: Some(response),
        }
    }
}

/// A decoded reply together with the subject it arrived on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedMessage {
    pub subject: String,
    pub header: MessageHeader,
    pub response: CommandResponse,
}

/// Raw machine state record as published by the machine
pub type MachineStateRecord = Map<String, Value>;
