//! Integration tests for the workflow state machine.
//!
//! The remote service is replaced by a scripted `StubGateway`; every test
//! drives the machine through real intents and inspects snapshots, so the
//! stage invariants are checked end to end.

use std::sync::Arc;
use std::time::Duration;

use courseforge_core::gateway::GatewayError;
use courseforge_core::model::{DetailLevel, TextbookSubmission};
use courseforge_core::orchestrator::OperationStatus;
use courseforge_core::workflow::{WorkflowError, WorkflowStage, WorkflowStateMachine};
use courseforge_test_utils::{sample_detail, sample_outline, StubGateway};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn machine(gateway: &StubGateway) -> WorkflowStateMachine {
    WorkflowStateMachine::new(Arc::new(gateway.clone()))
}

/// Drive a machine into `ShowingOutline` with `count` modules.
async fn machine_showing_outline(gateway: &StubGateway, count: u32) -> WorkflowStateMachine {
    gateway.push_outline(Ok(sample_outline(count)));
    let machine = machine(gateway);
    machine
        .submit_textbook(TextbookSubmission::new("Lesson 1: Water Cycle"))
        .await
        .expect("outline submission should succeed");
    machine
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_submission_shows_outline() {
    // Scenario: submit with module_count 3, gateway answers with 3 modules.
    let gateway = StubGateway::new();
    gateway.push_outline(Ok(sample_outline(3)));
    let machine = machine(&gateway);

    let mut submission = TextbookSubmission::new("Lesson 1: Water Cycle");
    submission.module_count = 3;
    machine.submit_textbook(submission).await.unwrap();

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingOutline);
    let outline = snapshot.outline.expect("outline should be stored");
    assert_eq!(outline.modules.len(), 3);
    assert_eq!(outline.total_modules, 3);
    assert!(snapshot.status.is_idle());

    // The wire request carried the submission verbatim.
    let request = gateway.last_outline_request().unwrap();
    assert_eq!(request.textbook_content, "Lesson 1: Water Cycle");
    assert_eq!(request.module_count, 3);
}

#[tokio::test]
async fn empty_content_never_reaches_the_gateway() {
    let gateway = StubGateway::new();
    let machine = machine(&gateway);

    let error = machine
        .submit_textbook(TextbookSubmission::new(""))
        .await
        .unwrap_err();
    assert!(matches!(error, WorkflowError::Validation(_)));

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::CollectingInput);
    assert_eq!(gateway.outline_calls(), 0);
    assert!(snapshot.status.is_idle());
}

#[tokio::test]
async fn failed_generation_leaves_no_partial_state() {
    let gateway = StubGateway::new();
    gateway.push_outline(Err(GatewayError::Remote("model overloaded".into())));
    let machine = machine(&gateway);

    let error = machine
        .submit_textbook(TextbookSubmission::new("some textbook text"))
        .await
        .unwrap_err();
    assert!(matches!(error, WorkflowError::Generation { .. }));

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::CollectingInput);
    // No partial state: neither the submission nor an outline was stored.
    assert!(snapshot.submission.is_none());
    assert!(snapshot.outline.is_none());
    assert_eq!(
        snapshot.status,
        OperationStatus::Failed {
            message: "model overloaded".into()
        }
    );
}

#[tokio::test]
async fn resubmission_replaces_outline_atomically() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    // Walk into the detail stage, then back to the outline.
    gateway.push_detail(Ok(sample_detail("m2")));
    machine.select_module("m2").await.unwrap();
    machine.go_back_to_outline().unwrap();

    // Resubmit from ShowingOutline: the new outline replaces everything.
    gateway.push_outline(Ok(sample_outline(2)));
    machine
        .submit_textbook(TextbookSubmission::new("a different textbook"))
        .await
        .unwrap();

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingOutline);
    assert_eq!(snapshot.outline.unwrap().modules.len(), 2);
    assert!(snapshot.selected_module.is_none());
    assert!(snapshot.detail.is_none());
    assert_eq!(snapshot.submission.unwrap().content, "a different textbook");
}

#[tokio::test]
async fn submission_from_detail_stage_is_an_invalid_transition() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;
    gateway.push_detail(Ok(sample_detail("m1")));
    machine.select_module("m1").await.unwrap();

    let error = machine
        .submit_textbook(TextbookSubmission::new("new text"))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        WorkflowError::InvalidTransition {
            stage: WorkflowStage::ShowingDetail,
            ..
        }
    ));
    assert_eq!(machine.snapshot().stage, WorkflowStage::ShowingDetail);
    assert_eq!(gateway.outline_calls(), 1);
}

// ---------------------------------------------------------------------------
// Module selection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn selecting_a_module_shows_its_detail() {
    // Scenario: select "m2", gateway answers with moduleId "m2".
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    gateway.push_detail(Ok(sample_detail("m2")));
    machine.select_module("m2").await.unwrap();

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingDetail);
    assert_eq!(snapshot.selected_module.unwrap().module_id, "m2");
    assert_eq!(snapshot.detail.unwrap().module_id, "m2");
    assert!(snapshot.status.is_idle());
}

#[tokio::test]
async fn detail_request_carries_the_original_textbook_content() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    gateway.push_detail(Ok(sample_detail("m1")));
    machine.select_module("m1").await.unwrap();

    let request = gateway.last_detail_request().unwrap();
    // Carry-over context: the submission text is reused verbatim.
    assert_eq!(request.textbook_content, "Lesson 1: Water Cycle");
    assert_eq!(request.module_info.module_id, "m1");
    assert_eq!(request.detail_level, DetailLevel::Standard);
    assert_eq!(request.exercise_count, 5);
}

#[tokio::test]
async fn failed_detail_clears_the_selection() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    gateway.push_detail(Err(GatewayError::Transport("connection reset".into())));
    let error = machine.select_module("m1").await.unwrap_err();
    assert!(matches!(error, WorkflowError::Generation { .. }));

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingOutline);
    assert!(snapshot.selected_module.is_none());
    assert!(snapshot.detail.is_none());
    assert!(matches!(snapshot.status, OperationStatus::Failed { .. }));
}

#[tokio::test]
async fn timed_out_detail_reverts_the_selection() {
    // Scenario: the gateway call exceeds its wait bound.
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    gateway.push_detail(Err(GatewayError::Timeout(Duration::from_secs(120))));
    let error = machine.select_module("m2").await.unwrap_err();

    match error {
        WorkflowError::Generation { message, source } => {
            assert!(message.contains("timed out"), "message: {message}");
            assert!(matches!(source, GatewayError::Timeout(_)));
        }
        other => panic!("expected Generation error, got {other:?}"),
    }
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingOutline);
    assert!(snapshot.selected_module.is_none());
}

#[tokio::test]
async fn mismatched_module_id_is_a_contract_violation() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    // The service answers for a module nobody asked about.
    gateway.push_detail(Ok(sample_detail("m9")));
    let error = machine.select_module("m2").await.unwrap_err();

    match error {
        WorkflowError::Generation { message, source } => {
            assert!(message.contains("m9") && message.contains("m2"), "message: {message}");
            assert!(matches!(source, GatewayError::Remote(_)));
        }
        other => panic!("expected Generation error, got {other:?}"),
    }

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingOutline);
    assert!(snapshot.selected_module.is_none());
    assert!(snapshot.detail.is_none());
    assert!(matches!(snapshot.status, OperationStatus::Failed { .. }));
}

// ---------------------------------------------------------------------------
// Concurrency discipline
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_selection_is_rejected_while_one_is_in_flight() {
    let gateway = StubGateway::new();
    let machine = Arc::new(machine_showing_outline(&gateway, 3).await);

    let gate = gateway.hold_next_detail();
    gateway.push_detail(Ok(sample_detail("m1")));

    let first = {
        let machine = Arc::clone(&machine);
        tokio::spawn(async move { machine.select_module("m1").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(machine.snapshot().status.is_in_progress());

    // A second selection is rejected immediately, never queued, and must
    // not disturb the first call's recorded selection.
    let second = machine.select_module("m2").await.unwrap_err();
    assert!(matches!(second, WorkflowError::OperationInProgress));
    assert_eq!(gateway.detail_calls(), 1);
    let rejected = machine.snapshot();
    assert_eq!(rejected.selected_module.unwrap().module_id, "m1");

    // The first call's eventual result is the only state mutation.
    gate.release();
    first.await.unwrap().unwrap();
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingDetail);
    assert_eq!(snapshot.detail.unwrap().module_id, "m1");
    assert_eq!(snapshot.selected_module.unwrap().module_id, "m1");
}

#[tokio::test]
async fn resubmission_is_rejected_while_detail_is_in_flight() {
    let gateway = StubGateway::new();
    let machine = Arc::new(machine_showing_outline(&gateway, 3).await);

    let gate = gateway.hold_next_detail();
    gateway.push_detail(Ok(sample_detail("m1")));

    let in_flight = {
        let machine = Arc::clone(&machine);
        tokio::spawn(async move { machine.select_module("m1").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let error = machine
        .submit_textbook(TextbookSubmission::new("another textbook"))
        .await
        .unwrap_err();
    assert!(matches!(error, WorkflowError::OperationInProgress));
    assert_eq!(gateway.outline_calls(), 1);

    gate.release();
    in_flight.await.unwrap().unwrap();
}

#[tokio::test]
async fn going_back_to_input_discards_an_in_flight_detail_result() {
    let gateway = StubGateway::new();
    let machine = Arc::new(machine_showing_outline(&gateway, 3).await);

    let gate = gateway.hold_next_detail();
    gateway.push_detail(Ok(sample_detail("m1")));

    let in_flight = {
        let machine = Arc::clone(&machine);
        tokio::spawn(async move { machine.select_module("m1").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The user abandons the outline while the call is parked.
    machine.go_back_to_input();

    gate.release();
    in_flight.await.unwrap().unwrap();

    // The late result must not resurrect the detail stage.
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::CollectingInput);
    assert!(snapshot.detail.is_none());
    assert!(snapshot.outline.is_none());
}

// ---------------------------------------------------------------------------
// Going back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn go_back_to_outline_keeps_resume_data() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;
    gateway.push_detail(Ok(sample_detail("m3")));
    machine.select_module("m3").await.unwrap();

    machine.go_back_to_outline().unwrap();

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingOutline);
    assert!(snapshot.outline.is_some());
    assert!(snapshot.submission.is_some());
    assert!(snapshot.selected_module.is_none());
    assert!(snapshot.detail.is_none());

    // Re-selecting after going back works normally.
    gateway.push_detail(Ok(sample_detail("m1")));
    machine.select_module("m1").await.unwrap();
    assert_eq!(machine.snapshot().stage, WorkflowStage::ShowingDetail);
}

#[tokio::test]
async fn go_back_to_input_is_idempotent_from_every_stage() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;
    gateway.push_detail(Ok(sample_detail("m1")));
    machine.select_module("m1").await.unwrap();

    machine.go_back_to_input();
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::CollectingInput);
    assert!(snapshot.outline.is_none());
    assert!(snapshot.selected_module.is_none());
    assert!(snapshot.detail.is_none());
    // The submission survives as a prefill.
    assert_eq!(snapshot.submission.unwrap().content, "Lesson 1: Water Cycle");

    // Calling it again from CollectingInput changes nothing.
    machine.go_back_to_input();
    assert_eq!(machine.snapshot().stage, WorkflowStage::CollectingInput);
}

// ---------------------------------------------------------------------------
// Stage gates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn select_module_requires_outline_stage() {
    let gateway = StubGateway::new();
    let error = machine(&gateway).select_module("m1").await.unwrap_err();
    assert!(matches!(
        error,
        WorkflowError::InvalidTransition {
            stage: WorkflowStage::CollectingInput,
            ..
        }
    ));
}

#[tokio::test]
async fn go_back_to_outline_requires_detail_stage() {
    let gateway = StubGateway::new();
    assert!(matches!(
        machine(&gateway).go_back_to_outline().unwrap_err(),
        WorkflowError::InvalidTransition {
            stage: WorkflowStage::CollectingInput,
            ..
        }
    ));
}

#[tokio::test]
async fn unknown_module_is_rejected_without_a_call() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    let error = machine.select_module("nope").await.unwrap_err();
    assert!(matches!(error, WorkflowError::UnknownModule(id) if id == "nope"));
    // Stage and status untouched.
    let snapshot = machine.snapshot();
    assert_eq!(snapshot.stage, WorkflowStage::ShowingOutline);
    assert!(snapshot.status.is_idle());
    assert_eq!(gateway.detail_calls(), 0);
}

#[tokio::test]
async fn go_back_to_input_clears_a_stale_failure_status() {
    let gateway = StubGateway::new();
    let machine = machine_showing_outline(&gateway, 3).await;

    gateway.push_detail(Err(GatewayError::Remote("upstream error".into())));
    let _ = machine.select_module("m1").await.unwrap_err();
    assert!(matches!(
        machine.snapshot().status,
        OperationStatus::Failed { .. }
    ));

    machine.go_back_to_input();
    assert!(machine.snapshot().status.is_idle());
}
