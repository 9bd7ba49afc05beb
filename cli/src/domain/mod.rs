//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod batch;
pub mod command;
pub mod error;
pub mod schema;
pub mod state;

pub use batch::{BatchFailure, BatchPhase, BatchResult, BatchRun, RunId};
pub use command::{Attribution, prepare_batch};
pub use error::{ChannelError, SchemaError, StateError, TransportError, ValidationError};
pub use schema::{CommandSchema, ParamSpec, ParamType, SchemaRegistry};
pub use state::MachineState;
