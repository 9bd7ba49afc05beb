//! Valkey transport: implements `MessageBus` and `StateStore` with Fred.
//!
//! Two clients share one configuration: `publisher` carries publishes and
//! key/value reads, `subscriber` only ever holds pub/sub subscriptions (a
//! RESP2 connection in subscribe mode cannot run other commands).
//!
//! Machine state lives in one hash per machine: the hash key is the derived
//! namespace, the field is the raw machine id, the value is the JSON record.

use std::time::Duration;

use fred::error::ErrorKind;
use fred::prelude::*;
use fred::types::Message;
use tokio::sync::broadcast::{self, error::RecvError};

use puda_common::PudaConfig;

use crate::application::ports::{MessageBus, StateStore, Subscription};
use crate::domain::TransportError;

/// Connected Valkey transport.
#[derive(Clone)]
pub struct ValkeyTransport {
    publisher: Client,
    subscriber: Client,
}

impl ValkeyTransport {
    /// Connect both clients and verify with PING.
    ///
    /// Every connection attempt and every later command is bounded by
    /// `config.connect_timeout()`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Connect` if the URL is invalid or the server
    /// cannot be reached in time.
    pub async fn connect(config: &PudaConfig) -> Result<Self, TransportError> {
        let url = config.valkey_url.as_str();
        let connect_err = |reason: String| TransportError::Connect {
            url: url.to_string(),
            reason,
        };

        let fred_config = Config::from_url(url).map_err(|e| connect_err(e.to_string()))?;
        let connect_timeout = config.connect_timeout();
        let publisher = client_builder(fred_config, connect_timeout)
            .build()
            .map_err(|e| connect_err(e.to_string()))?;
        let subscriber = publisher.clone_new();

        for client in [&publisher, &subscriber] {
            tokio::time::timeout(connect_timeout, client.init())
                .await
                .map_err(|_| connect_err(format!("no connection after {}s", connect_timeout.as_secs())))?
                .map_err(|e| connect_err(e.to_string()))?;
        }

        publisher
            .ping::<String>(None)
            .await
            .map_err(|e| connect_err(format!("startup PING failed: {e}")))?;

        tracing::info!(url, "Valkey connection ready");
        Ok(Self {
            publisher,
            subscriber,
        })
    }

    /// Close both connections. Errors are logged, not returned.
    pub async fn shutdown(self) {
        for client in [&self.subscriber, &self.publisher] {
            if let Err(e) = client.quit().await {
                tracing::warn!(error = %e, "error closing Valkey connection");
            }
        }
        tracing::debug!("Valkey connection closed");
    }
}

/// Reconnect attempts before pending commands fail.
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Messages buffered per subscriber before slow readers lag.
///
/// Every open reply subscription shares this buffer, so it bounds how many
/// replies may be in flight at once without being dropped.
const BROADCAST_CAPACITY: usize = 4096;

/// Client builder shared by the publisher and subscriber.
///
/// Every command, including ones queued while reconnecting, fails after
/// `command_timeout`, and reconnection gives up after a few attempts.
fn client_builder(config: Config, command_timeout: Duration) -> Builder {
    let mut builder = Builder::from_config(config);
    builder
        .with_connection_config(|conn_config| {
            conn_config.connection_timeout = command_timeout;
            conn_config.internal_command_timeout = command_timeout;
        })
        .with_performance_config(|perf| {
            perf.default_command_timeout = command_timeout;
            perf.broadcast_channel_capacity = BROADCAST_CAPACITY;
        })
        .set_policy(ReconnectPolicy::new_exponential(
            MAX_RECONNECT_ATTEMPTS,
            100,
            2000,
            2,
        ));
    builder
}

fn map_err(operation: &'static str) -> impl Fn(Error) -> TransportError {
    move |e| match e.kind() {
        ErrorKind::IO | ErrorKind::Canceled | ErrorKind::Timeout => {
            TransportError::ConnectionLost(format!("{operation}: {e}"))
        }
        _ => TransportError::operation(operation, e),
    }
}

impl MessageBus for ValkeyTransport {
    type Subscription = ValkeySubscription;

    async fn subscribe(&self, subject: &str) -> Result<ValkeySubscription, TransportError> {
        // Take the receiver first so nothing published right after SUBSCRIBE is missed.
        let rx = self.subscriber.message_rx();
        self.subscriber
            .subscribe(subject)
            .await
            .map_err(map_err("SUBSCRIBE"))?;
        tracing::trace!(subject, "subscribed");
        Ok(ValkeySubscription {
            client: self.subscriber.clone(),
            subject: subject.to_string(),
            rx,
            active: true,
        })
    }

    async fn publish(&self, subject: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let text = String::from_utf8(payload)
            .map_err(|e| TransportError::operation("PUBLISH", format!("payload is not UTF-8: {e}")))?;
        let receivers: i64 = self
            .publisher
            .publish(subject, text)
            .await
            .map_err(map_err("PUBLISH"))?;
        if receivers == 0 {
            tracing::warn!(subject, "published command has no subscribers; is the machine online?");
        }
        Ok(())
    }
}

impl StateStore for ValkeyTransport {
    async fn read(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, TransportError> {
        let raw: Option<String> = self
            .publisher
            .hget(namespace, key)
            .await
            .map_err(map_err("HGET"))?;
        Ok(raw.map(String::into_bytes))
    }
}

/// One subject's subscription on the shared subscriber client.
pub struct ValkeySubscription {
    client: Client,
    subject: String,
    rx: broadcast::Receiver<Message>,
    active: bool,
}

impl Subscription for ValkeySubscription {
    fn subject(&self) -> &str {
        &self.subject
    }

    async fn next_message(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            match self.rx.recv().await {
                Ok(message) if &*message.channel == self.subject.as_str() => {
                    if let Some(bytes) = message.value.as_bytes() {
                        return Ok(bytes.to_vec());
                    }
                    tracing::debug!(subject = %self.subject, "skipping non-binary message");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subject = %self.subject, skipped, "subscriber lagged; messages dropped");
                }
                Err(RecvError::Closed) => {
                    return Err(TransportError::ConnectionLost(
                        "subscriber message stream closed".into(),
                    ));
                }
            }
        }
    }

    async fn unsubscribe(mut self) -> Result<(), TransportError> {
        self.active = false;
        self.client
            .unsubscribe(self.subject.as_str())
            .await
            .map_err(map_err("UNSUBSCRIBE"))
    }
}

impl Drop for ValkeySubscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        // Dropped without `unsubscribe` (e.g. the caller's future was cancelled).
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let client = self.client.clone();
            let subject = std::mem::take(&mut self.subject);
            handle.spawn(async move {
                if let Err(e) = client.unsubscribe(subject.as_str()).await {
                    tracing::warn!(subject, error = %e, "deferred UNSUBSCRIBE failed");
                }
            });
        }
    }
}
