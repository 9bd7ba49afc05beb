//! Command implementations

pub mod catalog;
pub mod get_state;
pub mod send_batch;
pub mod version;
