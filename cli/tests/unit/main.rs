//! Unit tests for the PUDA CLI
//!
//! These tests use an in-memory fabric and run fast without external I/O.

mod batch_orchestrator;
mod valkey_transport;
