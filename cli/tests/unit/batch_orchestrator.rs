//! Tests for the `batch` application service.
//!
//! Ordering, stop-at-first-failure, and validation-before-send, driven by a
//! scripted machine on the in-memory bus.

#![allow(clippy::expect_used)]

use std::time::Duration;

use puda_cli::application::{BatchOptions, BatchOrchestrator};
use puda_cli::domain::{Attribution, BatchFailure, SchemaRegistry, ValidationError};
use puda_common::{CommandResponse, CommandResponseStatus};
use serde_json::{Value, json};

use crate::mocks::{MemoryBus, MockReporter, NoopReporter, respond};

const PREFIX: &str = "puda";
const TIMEOUT: Duration = Duration::from_secs(30);

fn specs(names: &[&str]) -> Vec<Value> {
    names.iter().map(|n| json!({"name": n})).collect()
}

fn attribution() -> Attribution {
    Attribution::new("first", "u-42", "ada")
}

fn options<'a>(reporter: &'a NoopReporter, who: &'a Attribution) -> BatchOptions<'a, NoopReporter> {
    BatchOptions {
        reporter,
        attribution: who,
        timeout_per_command: TIMEOUT,
        schema: None,
    }
}

#[tokio::test]
async fn test_all_success_sends_every_command_in_order() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();

    let result = BatchOrchestrator::new(&bus, PREFIX)
        .run(specs(&["home", "attach_tip", "aspirate", "dispense"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    assert!(result.success);
    assert_eq!(result.sent, 4);
    assert_eq!(result.total, 4);
    assert_eq!(result.failed_at, None);
    assert_eq!(result.failure, None);
    assert_eq!(result.responses.len(), 4);
    assert_eq!(result.last_response, Some(CommandResponse::success()));
    assert_eq!(
        bus.published_names(),
        vec!["home", "attach_tip", "aspirate", "dispense"]
    );
    assert_eq!(bus.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_failure_at_second_command_stops_batch() {
    let bus = MemoryBus::fails_on("attach_tip");
    let who = attribution();

    let result = BatchOrchestrator::new(&bus, PREFIX)
        .run(specs(&["home", "attach_tip", "aspirate"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    assert!(!result.success);
    assert_eq!(result.sent, 2, "third command must never be sent");
    assert_eq!(result.failed_at, Some(2));
    assert_eq!(
        result.failure,
        Some(BatchFailure::Remote {
            status: "FAILURE".into(),
            message: Some("attach_tip rejected".into()),
        })
    );
    let last = result.last_response.expect("failing response kept");
    assert_eq!(last.status, CommandResponseStatus::Failure);
    assert_eq!(result.responses.len(), 2);
    assert_eq!(bus.published_names(), vec!["home", "attach_tip"]);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_at_second_command_stops_batch() {
    let bus = MemoryBus::stalls_on("attach_tip");
    let who = attribution();

    let result = BatchOrchestrator::new(&bus, PREFIX)
        .run(specs(&["home", "attach_tip", "aspirate"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    assert!(!result.success);
    assert_eq!(result.sent, 2);
    assert_eq!(result.failed_at, Some(2));
    assert_eq!(
        result.failure,
        Some(BatchFailure::TimedOut {
            timeout_secs: TIMEOUT.as_secs_f64()
        })
    );
    assert_eq!(result.responses.len(), 1, "only the first command answered");
    assert_eq!(bus.published_names(), vec!["home", "attach_tip"]);
    assert_eq!(bus.active_subscriptions(), 0);
}

#[tokio::test]
async fn test_error_status_counts_as_failure() {
    let bus = MemoryBus::new(|env| {
        let response = CommandResponse {
            status: CommandResponseStatus::Error,
            message: Some("deck collision".into()),
            data: None,
            completed_at: None,
        };
        vec![respond(env, response)]
    });
    let who = attribution();

    let result = BatchOrchestrator::new(&bus, PREFIX)
        .run(specs(&["home", "aspirate"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    assert_eq!(result.failed_at, Some(1));
    assert_eq!(result.sent, 1);
    assert!(matches!(
        result.failure,
        Some(BatchFailure::Remote { ref status, .. }) if status == "ERROR"
    ));
}

#[tokio::test]
async fn test_transport_failure_stops_batch() {
    let bus = MemoryBus::always_succeeds().fail_publish();
    let who = attribution();

    let result = BatchOrchestrator::new(&bus, PREFIX)
        .run(specs(&["home", "aspirate"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    assert!(!result.success);
    assert_eq!(result.failed_at, Some(1));
    assert!(matches!(result.failure, Some(BatchFailure::Transport { .. })));
    assert_eq!(result.last_response, None);
}

#[tokio::test]
async fn test_every_command_carries_the_same_run_id() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();

    let result = BatchOrchestrator::new(&bus, PREFIX)
        .run(specs(&["home", "attach_tip", "aspirate"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    for (_, envelope) in bus.published() {
        assert_eq!(envelope.header.run_id.as_deref(), Some(result.run_id.as_str()));
    }
}

#[tokio::test]
async fn test_separate_batches_get_distinct_run_ids() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();
    let orchestrator = BatchOrchestrator::new(&bus, PREFIX);

    let first = orchestrator
        .run(specs(&["home"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");
    let second = orchestrator
        .run(specs(&["home"]), options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_step_numbers_and_params_reach_the_machine() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();
    let batch = vec![json!({
        "name": "aspirate",
        "params": {"well": "A1", "volume": 50},
        "step_number": 3
    })];

    BatchOrchestrator::new(&bus, PREFIX)
        .run(batch, options(&NoopReporter, &who))
        .await
        .expect("valid batch");

    let (_, envelope) = &bus.published()[0];
    let command = envelope.command.as_ref().expect("command body");
    assert_eq!(command.step_number(), Some(3));
    assert_eq!(command.params()["well"], "A1");
    assert_eq!(command.params()["volume"], 50);
}

// ── Validation before send ────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_spec_sends_nothing() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();
    let batch = vec![json!({"name": "home"}), json!({"params": {}})];

    let err = BatchOrchestrator::new(&bus, PREFIX)
        .run(batch, options(&NoopReporter, &who))
        .await
        .expect_err("invalid");

    assert!(matches!(err, ValidationError::InvalidCommand { index: 2, .. }), "got {err:?}");
    assert!(bus.published().is_empty());
}

#[tokio::test]
async fn test_empty_batch_is_rejected() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();

    let err = BatchOrchestrator::new(&bus, PREFIX)
        .run(Vec::new(), options(&NoopReporter, &who))
        .await
        .expect_err("empty");

    assert_eq!(err, ValidationError::EmptyBatch);
    assert!(bus.published().is_empty());
}

#[tokio::test]
async fn test_missing_attribution_sends_nothing() {
    let bus = MemoryBus::always_succeeds();
    let who = Attribution::new("first", "u-42", "");

    let err = BatchOrchestrator::new(&bus, PREFIX)
        .run(specs(&["home"]), options(&NoopReporter, &who))
        .await
        .expect_err("invalid");

    assert_eq!(err, ValidationError::MissingAttribution { field: "username" });
    assert!(bus.published().is_empty());
}

#[tokio::test]
async fn test_zero_timeout_is_rejected() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();

    let err = BatchOrchestrator::new(&bus, PREFIX)
        .run(
            specs(&["home"]),
            BatchOptions {
                reporter: &NoopReporter,
                attribution: &who,
                timeout_per_command: Duration::ZERO,
                schema: None,
            },
        )
        .await
        .expect_err("invalid");

    assert_eq!(err, ValidationError::ZeroTimeout);
}

#[tokio::test]
async fn test_schema_violation_sends_nothing() {
    let registry = SchemaRegistry::from_json(
        r#"{"machine": "first", "commands": [
            {"name": "home", "params": []},
            {"name": "aspirate", "params": [
                {"name": "volume", "type": "number", "required": true}
            ]}
        ]}"#,
    )
    .expect("catalog");
    let bus = MemoryBus::always_succeeds();
    let who = attribution();
    let batch = vec![
        json!({"name": "home"}),
        json!({"name": "aspirate", "params": {"volume": "lots"}}),
    ];

    let err = BatchOrchestrator::new(&bus, PREFIX)
        .run(
            batch,
            BatchOptions {
                reporter: &NoopReporter,
                attribution: &who,
                timeout_per_command: TIMEOUT,
                schema: Some(&registry),
            },
        )
        .await
        .expect_err("schema violation");

    assert!(matches!(err, ValidationError::InvalidCommand { index: 2, .. }), "got {err:?}");
    assert!(bus.published().is_empty());
}

// ── Progress reporting ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reporter_sees_each_step_then_success() {
    let bus = MemoryBus::always_succeeds();
    let who = attribution();
    let mut reporter = MockReporter::new();
    let mut seq = mockall::Sequence::new();
    reporter
        .expect_step()
        .withf(|m| m == "[1/2] home")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    reporter
        .expect_step()
        .withf(|m| m == "[2/2] aspirate")
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    reporter
        .expect_success()
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    reporter.expect_warn().never();

    BatchOrchestrator::new(&bus, PREFIX)
        .run(
            specs(&["home", "aspirate"]),
            BatchOptions {
                reporter: &reporter,
                attribution: &who,
                timeout_per_command: TIMEOUT,
                schema: None,
            },
        )
        .await
        .expect("valid batch");
}

#[tokio::test]
async fn test_reporter_warns_on_failure() {
    let bus = MemoryBus::fails_on("home");
    let who = attribution();
    let mut reporter = MockReporter::new();
    reporter.expect_step().times(1).return_const(());
    reporter
        .expect_warn()
        .withf(|m| m.starts_with("command 1/2 failed"))
        .times(1)
        .return_const(());
    reporter.expect_success().never();

    BatchOrchestrator::new(&bus, PREFIX)
        .run(
            specs(&["home", "aspirate"]),
            BatchOptions {
                reporter: &reporter,
                attribution: &who,
                timeout_per_command: TIMEOUT,
                schema: None,
            },
        )
        .await
        .expect("valid batch");
}
