//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain`; never on `crate::infra`,
//! `crate::commands`, or `crate::output`.

pub mod ports;
pub mod services;

pub use ports::{MessageBus, ProgressReporter, StateStore, Subscription};
pub use services::batch::{BatchOptions, BatchOrchestrator};
pub use services::command_channel::CommandChannel;
pub use services::machine_state::StateAccessor;
