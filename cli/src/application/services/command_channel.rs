//! Application service: send one command and await its correlated reply.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through the injected `MessageBus`.

use std::time::Duration;

use chrono::Utc;
use puda_common::{
    CommandEnvelope, CommandRequest, CommandResponse, CorrelatedMessage, MessageHeader,
    MessageType, PROTOCOL_VERSION, command_subject, reply_subject,
};
use tokio::time::Instant;

use crate::application::ports::{MessageBus, Subscription};
use crate::domain::{Attribution, ChannelError, RunId};

/// Upper bound on releasing a reply subscription.
const UNSUBSCRIBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Request/reply channel to machines over a [`MessageBus`].
///
/// Holds no per-call state, so one channel can serve any number of
/// concurrent sends; each send has its own correlation token and reply
/// subscription.
pub struct CommandChannel<'a, B: MessageBus> {
    bus: &'a B,
    subject_prefix: &'a str,
}

impl<'a, B: MessageBus> CommandChannel<'a, B> {
    #[must_use]
    pub fn new(bus: &'a B, subject_prefix: &'a str) -> Self {
        Self {
            bus,
            subject_prefix,
        }
    }

    /// Send `request` and return the machine's response.
    ///
    /// # Errors
    ///
    /// See [`CommandChannel::exchange`].
    pub async fn send(
        &self,
        request: &CommandRequest,
        attribution: &Attribution,
        run_id: Option<&RunId>,
        timeout: Duration,
    ) -> Result<CommandResponse, ChannelError> {
        self.exchange(request, attribution, run_id, timeout)
            .await
            .map(|reply| reply.response)
    }

    /// Send `request` and return the correlated reply with its delivery
    /// metadata.
    ///
    /// Subscribes to a per-request reply subject before publishing, so a fast
    /// machine cannot answer before anyone is listening. Subscribing,
    /// publishing and waiting share one deadline of `timeout`; releasing the
    /// subscription is bounded separately and happens on every exit path.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a zero timeout or blank attribution
    /// - `Transport` if subscribing, publishing or receiving fails
    /// - `Timeout` if no matching reply arrives within `timeout`
    /// - `MalformedReply` if a payload on the reply subject cannot be decoded,
    ///   or the matching reply carries no response
    pub async fn exchange(
        &self,
        request: &CommandRequest,
        attribution: &Attribution,
        run_id: Option<&RunId>,
        timeout: Duration,
    ) -> Result<CorrelatedMessage, ChannelError> {
        if timeout.is_zero() {
            return Err(ChannelError::InvalidArgument(
                "timeout must be greater than zero".into(),
            ));
        }
        attribution
            .validate()
            .map_err(|e| ChannelError::InvalidArgument(e.to_string()))?;

        let machine_id = attribution.machine_id.as_str();
        let command_id = uuid::Uuid::new_v4().to_string();
        let reply_to = reply_subject(self.subject_prefix, machine_id, &command_id);
        let envelope = CommandEnvelope {
            header: MessageHeader {
                message_type: MessageType::Command,
                version: PROTOCOL_VERSION.to_string(),
                timestamp: Utc::now(),
                user_id: attribution.user_id.clone(),
                username: attribution.username.clone(),
                machine_id: machine_id.to_string(),
                run_id: run_id.map(ToString::to_string),
                command_id: command_id.clone(),
                reply_to: Some(reply_to.clone()),
            },
            command: Some(request.clone()),
            response: None,
        };
        let payload = serde_json::to_vec(&envelope)
            .map_err(|e| ChannelError::InvalidArgument(format!("cannot encode command: {e}")))?;

        let deadline = Instant::now() + timeout;
        let timed_out = || ChannelError::Timeout {
            machine_id: machine_id.to_string(),
            timeout,
        };

        let mut subscription = tokio::time::timeout_at(deadline, self.bus.subscribe(&reply_to))
            .await
            .map_err(|_| timed_out())??;
        let subject = command_subject(self.subject_prefix, machine_id);

        tracing::debug!(
            machine_id,
            command_id = %command_id,
            command = request.name(),
            subject = %subject,
            "publishing command",
        );

        let outcome = tokio::time::timeout_at(deadline, async {
            self.bus.publish(&subject, payload).await?;
            await_reply(&mut subscription, &command_id).await
        })
        .await;

        let release = subscription.unsubscribe();
        match tokio::time::timeout(timeout.min(UNSUBSCRIBE_TIMEOUT), release).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(command_id = %command_id, error = %e, "failed to release reply subscription");
            }
            Err(_) => {
                tracing::warn!(command_id = %command_id, "releasing reply subscription timed out");
            }
        }

        match outcome {
            Ok(reply) => reply,
            Err(_) => {
                tracing::warn!(
                    machine_id,
                    command_id = %command_id,
                    command = request.name(),
                    timeout_secs = timeout.as_secs_f64(),
                    "no reply before timeout",
                );
                Err(timed_out())
            }
        }
    }
}

/// Read from `subscription` until a reply carrying `command_id` arrives.
///
/// The reply subject belongs to this request alone, so any payload on it
/// that does not decode is this request's malformed reply. Well-formed
/// envelopes for other tokens are skipped.
async fn await_reply<S: Subscription>(
    subscription: &mut S,
    command_id: &str,
) -> Result<CorrelatedMessage, ChannelError> {
    loop {
        let payload = subscription.next_message().await?;
        let envelope: CommandEnvelope = serde_json::from_slice(&payload)
            .map_err(|e| ChannelError::MalformedReply(e.to_string()))?;

        if envelope.header.command_id != command_id {
            tracing::debug!(
                expected = command_id,
                received = %envelope.header.command_id,
                "skipping reply for another command",
            );
            continue;
        }
        if envelope.header.message_type != MessageType::Response {
            continue;
        }

        let response = envelope.response.ok_or_else(|| {
            ChannelError::MalformedReply(format!("reply to {command_id} carries no response"))
        })?;
        return Ok(CorrelatedMessage {
            subject: subscription.subject().to_string(),
            header: envelope.header,
            response,
        });
    }
}
