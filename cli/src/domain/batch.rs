//! Batch execution state machine.
//!
//! A batch moves through
//! `Pending → Sending(i) → AwaitingReply(i) → {Advancing(i) | Failed(i) | TimedOut(i)} → Done`.
//! Only `Sending(i)` hands out an index to send, and it is reached from
//! `Advancing(i - 1)` alone, so command `i` can never be sent before command
//! `i - 1` succeeded. Indices are 0-based here; [`BatchResult::failed_at`] is
//! 1-based.

use puda_common::CommandResponse;
use serde::Serialize;

use crate::domain::error::ChannelError;

// ── Run identifier ────────────────────────────────────────────────────────────

/// Identifier shared by every command of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Mint a fresh random (v4) run id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Phases ────────────────────────────────────────────────────────────────────

/// Where a batch currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Pending,
    Sending(usize),
    AwaitingReply(usize),
    Advancing(usize),
    Failed(usize),
    TimedOut(usize),
    Done,
}

/// Why a batch stopped early.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BatchFailure {
    /// The machine answered with a non-success status.
    Remote {
        status: String,
        message: Option<String>,
    },
    /// No reply arrived within the per-command timeout.
    TimedOut { timeout_secs: f64 },
    /// The fabric failed while sending or awaiting the reply.
    Transport { message: String },
    /// A reply arrived but could not be decoded.
    MalformedReply { message: String },
}

impl std::fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote { status, message } => match message {
                Some(m) => write!(f, "machine reported {status}: {m}"),
                None => write!(f, "machine reported {status}"),
            },
            Self::TimedOut { timeout_secs } => write!(f, "timed out after {timeout_secs}s"),
            Self::Transport { message } => write!(f, "transport error: {message}"),
            Self::MalformedReply { message } => write!(f, "malformed reply: {message}"),
        }
    }
}

/// Final outcome of one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub run_id: RunId,
    pub success: bool,
    /// Number of commands published.
    pub sent: usize,
    /// Total number of commands in the batch.
    pub total: usize,
    /// 1-based position of the command that stopped the batch.
    pub failed_at: Option<usize>,
    pub failure: Option<BatchFailure>,
    pub last_response: Option<CommandResponse>,
    /// Every response received, in send order.
    pub responses: Vec<CommandResponse>,
}

// ── Run ───────────────────────────────────────────────────────────────────────

/// Mutable record of one batch in progress.
#[derive(Debug)]
pub struct BatchRun {
    run_id: RunId,
    total: usize,
    phase: BatchPhase,
    sent: usize,
    responses: Vec<CommandResponse>,
    failure: Option<BatchFailure>,
}

impl BatchRun {
    #[must_use]
    pub fn new(run_id: RunId, total: usize) -> Self {
        Self {
            run_id,
            total,
            phase: BatchPhase::Pending,
            sent: 0,
            responses: Vec::with_capacity(total),
            failure: None,
        }
    }

    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    #[must_use]
    pub fn phase(&self) -> BatchPhase {
        self.phase
    }

    /// Index of the next command to publish, moving `Sending(i)` to
    /// `AwaitingReply(i)`. Returns `None` once the batch is finished.
    pub fn next_to_send(&mut self) -> Option<usize> {
        self.settle();
        match self.phase {
            BatchPhase::Sending(i) => {
                self.phase = BatchPhase::AwaitingReply(i);
                self.sent += 1;
                Some(i)
            }
            _ => None,
        }
    }

    /// Record the outcome of the command currently awaiting its reply.
    ///
    /// Has no effect outside `AwaitingReply`.
    pub fn record(&mut self, outcome: Result<CommandResponse, ChannelError>) {
        let BatchPhase::AwaitingReply(i) = self.phase else {
            tracing::debug!(phase = ?self.phase, "ignoring outcome outside AwaitingReply");
            return;
        };
        self.phase = match outcome {
            Ok(response) if response.status.is_success() => {
                self.responses.push(response);
                BatchPhase::Advancing(i)
            }
            Ok(response) => {
                self.failure = Some(BatchFailure::Remote {
                    status: response.status.to_string(),
                    message: response.message.clone(),
                });
                self.responses.push(response);
                BatchPhase::Failed(i)
            }
            Err(ChannelError::Timeout { timeout, .. }) => {
                self.failure = Some(BatchFailure::TimedOut {
                    timeout_secs: timeout.as_secs_f64(),
                });
                BatchPhase::TimedOut(i)
            }
            Err(ChannelError::MalformedReply(message)) => {
                self.failure = Some(BatchFailure::MalformedReply { message });
                BatchPhase::Failed(i)
            }
            Err(e @ (ChannelError::Transport(_) | ChannelError::InvalidArgument(_))) => {
                self.failure = Some(BatchFailure::Transport {
                    message: e.to_string(),
                });
                BatchPhase::Failed(i)
            }
        };
    }

    /// Resolve transient phases: start a pending batch, move past a
    /// successful command, or finish.
    fn settle(&mut self) {
        self.phase = match self.phase {
            BatchPhase::Pending if self.total == 0 => BatchPhase::Done,
            BatchPhase::Pending => BatchPhase::Sending(0),
            BatchPhase::Advancing(i) if i + 1 < self.total => BatchPhase::Sending(i + 1),
            BatchPhase::Advancing(_) => BatchPhase::Done,
            other => other,
        };
    }

    /// Close the batch and produce its result.
    #[must_use]
    pub fn finish(mut self) -> BatchResult {
        self.settle();
        let failed_at = match self.phase {
            BatchPhase::Failed(i)
            | BatchPhase::TimedOut(i)
            | BatchPhase::AwaitingReply(i)
            | BatchPhase::Sending(i) => Some(i + 1),
            _ => None,
        };
        let success = self.phase == BatchPhase::Done && self.failure.is_none();
        BatchResult {
            run_id: self.run_id,
            success,
            sent: self.sent,
            total: self.total,
            failed_at,
            failure: self.failure,
            last_response: self.responses.last().cloned(),
            responses: self.responses,
        }
    }
}
