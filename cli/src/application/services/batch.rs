//! Application service: run an ordered batch of commands on one machine.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::time::Duration;

use puda_common::CommandRequest;
use serde_json::Value;

use crate::application::ports::{MessageBus, ProgressReporter};
use crate::application::services::command_channel::CommandChannel;
use crate::domain::{
    Attribution, BatchResult, BatchRun, RunId, SchemaRegistry, ValidationError, prepare_batch,
};

/// Options for one batch run.
pub struct BatchOptions<'a, R: ProgressReporter> {
    pub reporter: &'a R,
    pub attribution: &'a Attribution,
    pub timeout_per_command: Duration,
    /// Command catalog to validate against; structural checks only when `None`.
    pub schema: Option<&'a SchemaRegistry>,
}

/// Sends batches strictly in order through a [`CommandChannel`].
pub struct BatchOrchestrator<'a, B: MessageBus> {
    channel: CommandChannel<'a, B>,
}

impl<'a, B: MessageBus> BatchOrchestrator<'a, B> {
    #[must_use]
    pub fn new(bus: &'a B, subject_prefix: &'a str) -> Self {
        Self {
            channel: CommandChannel::new(bus, subject_prefix),
        }
    }

    /// Validate `specs` and run them as one batch.
    ///
    /// Nothing is sent unless every spec and the attribution are valid.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` when the batch is rejected before sending.
    /// Failures after sending starts are reported inside the `BatchResult`.
    pub async fn run(
        &self,
        specs: Vec<Value>,
        opts: BatchOptions<'_, impl ProgressReporter>,
    ) -> Result<BatchResult, ValidationError> {
        let requests = prepare_batch(specs, opts.schema)?;
        self.run_requests(&requests, opts).await
    }

    /// Run already-constructed requests as one batch.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an empty batch, blank attribution or a
    /// zero timeout.
    pub async fn run_requests(
        &self,
        requests: &[CommandRequest],
        opts: BatchOptions<'_, impl ProgressReporter>,
    ) -> Result<BatchResult, ValidationError> {
        let BatchOptions {
            reporter,
            attribution,
            timeout_per_command,
            ..
        } = opts;

        if requests.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if timeout_per_command.is_zero() {
            return Err(ValidationError::ZeroTimeout);
        }
        attribution.validate()?;

        let run_id = RunId::generate();
        let total = requests.len();
        tracing::info!(
            run_id = %run_id,
            machine_id = %attribution.machine_id,
            user = %attribution.username,
            commands = total,
            "starting batch",
        );

        let mut run = BatchRun::new(run_id.clone(), total);
        while let Some(index) = run.next_to_send() {
            let request = &requests[index];
            reporter.step(&format!("[{}/{total}] {}", index + 1, request.name()));
            tracing::info!(run_id = %run_id, index = index + 1, command = request.name(), "sending command");

            let outcome = self
                .channel
                .send(request, attribution, Some(&run_id), timeout_per_command)
                .await;

            match &outcome {
                Ok(response) if response.status.is_success() => {
                    tracing::debug!(run_id = %run_id, index = index + 1, "command succeeded");
                }
                Ok(response) => {
                    tracing::warn!(
                        run_id = %run_id,
                        index = index + 1,
                        status = %response.status,
                        message = response.message.as_deref().unwrap_or(""),
                        "command failed",
                    );
                }
                Err(e) => {
                    tracing::warn!(run_id = %run_id, index = index + 1, error = %e, "command not completed");
                }
            }
            run.record(outcome);
        }

        let result = run.finish();
        match (&result.failed_at, &result.failure) {
            (Some(at), Some(failure)) => {
                reporter.warn(&format!("command {at}/{total} failed: {failure}"));
                tracing::warn!(run_id = %result.run_id, failed_at = at, "batch stopped");
            }
            _ => {
                reporter.success(&format!("{total} commands completed"));
                tracing::info!(run_id = %result.run_id, "batch completed");
            }
        }
        Ok(result)
    }
}
