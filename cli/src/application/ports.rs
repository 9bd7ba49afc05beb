//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain`; never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use crate::domain::TransportError;

// ── Messaging Ports ───────────────────────────────────────────────────────────

/// Publish/subscribe half of the message fabric.
///
/// Implementations must be safe to share between concurrent callers; every
/// caller gets its own [`Subscription`].
#[allow(async_fn_in_trait)]
pub trait MessageBus {
    /// Live subscription handle returned by [`MessageBus::subscribe`].
    type Subscription: Subscription;

    /// Start receiving messages published on `subject`.
    async fn subscribe(&self, subject: &str) -> Result<Self::Subscription, TransportError>;
    /// Publish `payload` on `subject`.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError>;
}

/// A subscription to one subject.
#[allow(async_fn_in_trait)]
pub trait Subscription {
    /// Subject this subscription listens on.
    fn subject(&self) -> &str;
    /// Wait for the next message payload.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ConnectionLost` if the subscription ends.
    async fn next_message(&mut self) -> Result<Vec<u8>, TransportError>;
    /// Stop receiving and release the subscription on the fabric.
    async fn unsubscribe(self) -> Result<(), TransportError>;
}

// ── Key/Value Port ────────────────────────────────────────────────────────────

/// Read-only view of the fabric's durable key/value namespaces.
#[allow(async_fn_in_trait)]
pub trait StateStore {
    /// Read `key` inside `namespace`, returning `None` when either is missing.
    async fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, TransportError>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
