//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::time::Duration;

use puda_common::CommandSpecError;
use thiserror::Error;

// ── Transport errors ──────────────────────────────────────────────────────────

/// Failures of the messaging fabric itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("cannot connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("connection to the message fabric was lost: {0}")]
    ConnectionLost(String),

    #[error("{operation} failed: {reason}")]
    Operation {
        operation: &'static str,
        reason: String,
    },
}

impl TransportError {
    /// Shorthand for a failed fabric operation.
    pub fn operation(operation: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Operation {
            operation,
            reason: reason.to_string(),
        }
    }
}

// ── Command channel errors ────────────────────────────────────────────────────

/// Errors from sending a single command and awaiting its reply.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("no reply from machine '{machine_id}' within {}s", timeout.as_secs_f64())]
    Timeout {
        machine_id: String,
        timeout: Duration,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed reply: {0}")]
    MalformedReply(String),

    #[error("invalid send argument: {0}")]
    InvalidArgument(String),
}

// ── State store errors ────────────────────────────────────────────────────────

/// Errors from reading a machine's state record.
///
/// A record that was never published is not an error; see
/// [`crate::domain::state::MachineState::Absent`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("state of machine '{machine_id}' is not a valid record: {reason}")]
    Decode { machine_id: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid machine ID '{machine_id}': {reason}")]
    InvalidMachineId { machine_id: String, reason: String },
}

// ── Validation errors ─────────────────────────────────────────────────────────

/// Errors that reject a batch before anything is sent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Batch contains no commands.")]
    EmptyBatch,

    #[error("Command {index} is invalid: {reason}")]
    InvalidCommand { index: usize, reason: String },

    #[error("{field} must not be empty.")]
    MissingAttribution { field: &'static str },

    #[error("Invalid machine ID '{machine_id}': {reason}")]
    InvalidMachineId { machine_id: String, reason: String },

    #[error("Timeout must be greater than zero.")]
    ZeroTimeout,
}

impl ValidationError {
    /// Attach a 1-based command index to a spec error.
    #[must_use]
    pub fn at(index: usize, err: &CommandSpecError) -> Self {
        Self::InvalidCommand {
            index,
            reason: err.to_string(),
        }
    }
}

// ── Schema errors ─────────────────────────────────────────────────────────────

/// Reasons a command does not match the machine's command schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' has no parameter '{param}'")]
    UnknownParam { command: String, param: String },

    #[error("'{command}' requires parameter '{param}'")]
    MissingParam { command: String, param: String },

    #[error("parameter '{param}' of '{command}' must be {expected}, got {actual}")]
    TypeMismatch {
        command: String,
        param: String,
        expected: String,
        actual: String,
    },
}
