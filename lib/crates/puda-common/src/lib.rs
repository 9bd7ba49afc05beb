//! Wire types, subject naming and client configuration shared by PUDA
//! controllers.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod subjects;
pub mod types;

pub use config::PudaConfig;
pub use subjects::{
    command_subject, derive_namespace, keys, reply_subject, sanitize_machine_id,
    validate_machine_id,
};
pub use types::*;
