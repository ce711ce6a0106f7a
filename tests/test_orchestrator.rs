//! Orchestrator control-flow tests: termination, contract enforcement,
//! failure handling and the SLA rule


use casework::case::CaseState;
use casework::orchestrator::{OrchestratorError, Termination, ORCHESTRATOR_HANDLER};
use casework::testing::{Capability, FixedGuardrail, ScriptedCollaborators};
use casework::Severity;
use chrono::Duration;
use std::sync::Arc;
use test_helpers::*;

#[tokio::test]
async fn test_happy_path_completes_in_one_pass() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config);
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    let outcome = orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Closed);
    assert!(outcome.is_terminal());
    assert_eq!(outcome.steps, 1);
    assert_eq!(outcome.handler_runs, 10);
    assert_eq!(case.events().len(), 10);
    assert!(case.events().iter().all(|e| e.step() == 1));
}

#[tokio::test]
async fn test_hallucination_check_precedes_dispatch_in_same_pass() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config);
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();

    let events = case.events();
    let hallucination = events
        .iter()
        .position(|e| e.handler() == "HallucinationAgent")
        .unwrap();
    let dispatch = events
        .iter()
        .position(|e| e.handler() == "DispatchAgent")
        .unwrap();

    assert_eq!(dispatch, hallucination + 1);
    assert_eq!(events[hallucination].step(), events[dispatch].step());
    assert_eq!(events[hallucination].state_entered(), "READY_TO_SEND");
    assert_eq!(events[dispatch].state_entered(), "SENT");
}

#[tokio::test]
async fn test_stalls_when_no_handler_is_eligible() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config).route(direct_route());
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    let outcome = orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();

    // READY_TO_SEND without a draft: nothing can dispatch it
    assert_eq!(outcome.termination, Termination::Stalled);
    assert_eq!(outcome.steps, 2);
    assert_eq!(case.state, CaseState::ReadyToSend);
    assert!(case.draft.is_none());
    assert!(!case.final_response_sent);
}

#[tokio::test]
async fn test_step_budget_exhaustion_leaves_last_state() {
    let mut config = test_config();
    config.orchestrator.max_total_steps = 1;
    let guardrail = Arc::new(FixedGuardrail::new(rejecting_report()));
    let scripted = ScriptedCollaborators::new(&config).guardrail(guardrail.clone());
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    let outcome = orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::StepBudgetExhausted);
    assert_eq!(outcome.steps, 1);
    assert_eq!(case.state, CaseState::QaReview);
    assert_eq!(case.revision_rounds, 1);
    assert_eq!(guardrail.calls(), 1);
}

#[tokio::test]
async fn test_collaborator_failure_moves_case_to_error() {
    let config = test_config();
    let scripted =
        ScriptedCollaborators::new(&config).failing(Capability::Drafting, "model endpoint down");
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    let err = orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap_err();

    match err {
        OrchestratorError::HandlerFailed {
            handler,
            step,
            source,
        } => {
            assert_eq!(handler, "DraftingAgent");
            assert_eq!(step, 1);
            assert_eq!(source.capability(), "drafting");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(case.state, CaseState::Error);
    assert!(case.draft.is_none());
    assert_eq!(case.errors.len(), 1);
    assert!(case.errors[0].starts_with("DraftingAgent: "));

    let last = case.last_event().unwrap();
    assert_eq!(last.handler(), ORCHESTRATOR_HANDLER);
    assert_eq!(last.action(), "handler_failed");
    assert_eq!(last.state_entered(), "ERROR");
    assert_eq!(last.payload()["handler"], "DraftingAgent");
    assert_eq!(case.events_by("DraftingAgent").count(), 0);
    assert_monotonic(&case);
}

#[tokio::test]
async fn test_failure_messages_are_sanitized() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config)
        .failing(Capability::Dispatcher, "gateway refused token=abc123");
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    let result = orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await;

    assert!(result.is_err());
    assert!(!case.final_response_sent);
    assert!(!case.errors[0].contains("abc123"));
    assert!(case.errors[0].contains("token=***"));
    let payload_error = case.last_event().unwrap().payload()["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(!payload_error.contains("abc123"));
}

#[tokio::test]
async fn test_hard_block_flag_errors_without_failure() {
    let mut config = test_config();
    config
        .risk
        .hard_block_flags
        .insert("POTENTIAL_FRAUD".to_string());
    let scripted = ScriptedCollaborators::new(&config);
    let mut case = case("C1", FRAUD_TEXT);

    let outcome = orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Errored);
    assert_eq!(case.state, CaseState::Error);
    assert_eq!(case.last_event().unwrap().action(), "risk_blocked");
    assert!(case.routing_queue.is_none());
}

#[tokio::test]
async fn test_sla_assigned_from_severity() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config);

    let mut medium = case("C1", UNAUTHORIZED_TEXT);
    orchestrator(&config)
        .process(&mut medium, &scripted.build())
        .await
        .unwrap();
    assert_eq!(medium.severity, Some(Severity::Med));
    assert_eq!(medium.sla_deadline, Some(medium.created_at + Duration::hours(48)));

    let mut high = case("C2", FRAUD_TEXT);
    orchestrator(&config)
        .process(&mut high, &scripted.build())
        .await
        .unwrap();
    assert_eq!(high.severity, Some(Severity::High));
    assert_eq!(high.sla_deadline, Some(high.created_at + Duration::hours(24)));
}

#[tokio::test]
async fn test_sla_deadline_set_once_across_resumption() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config);
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    // Stop after risk screening
    let outcome = partial_orchestrator(&config, 3)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();
    assert_eq!(outcome.termination, Termination::Stalled);
    assert_eq!(case.state, CaseState::RiskScreened);
    let deadline = case.sla_deadline.unwrap();

    // Reclassify with a higher severity; the deadline must not move
    case.severity = Some(Severity::Critical);
    orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();

    assert_eq!(case.state, CaseState::Closed);
    assert_eq!(case.sla_deadline, Some(deadline));
}

#[tokio::test]
async fn test_sla_deadline_not_recomputed_while_still_classified() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config);
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    // Without risk screening the case stays CLASSIFIED
    let intake = partial_orchestrator(&config, 2);
    let outcome = intake.process(&mut case, &scripted.build()).await.unwrap();
    assert_eq!(outcome.termination, Termination::Stalled);
    assert_eq!(case.state, CaseState::Classified);
    let deadline = case.sla_deadline.unwrap();
    assert_eq!(deadline, case.created_at + Duration::hours(48));

    // A critical severity would map to the 24h table if recomputed
    case.severity = Some(Severity::Critical);
    let outcome = intake.process(&mut case, &scripted.build()).await.unwrap();

    assert_eq!(outcome.termination, Termination::Stalled);
    assert_eq!(case.state, CaseState::Classified);
    assert_eq!(case.sla_deadline, Some(deadline));
}

#[tokio::test]
async fn test_escalated_case_gets_no_sla() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config);
    let mut case = case("C1", VAGUE_TEXT);

    orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .unwrap();

    assert!(case.sla_deadline.is_none());
    assert_eq!(case.state, CaseState::Closed);
}

#[tokio::test]
async fn test_resuming_an_errored_case_is_a_no_op() {
    let config = test_config();
    let scripted = ScriptedCollaborators::new(&config).failing(Capability::Scrubber, "offline");
    let mut case = case("C1", UNAUTHORIZED_TEXT);

    assert!(orchestrator(&config)
        .process(&mut case, &scripted.build())
        .await
        .is_err());
    let events = case.events().len();

    let outcome = orchestrator(&config)
        .process(&mut case, &ScriptedCollaborators::new(&config).build())
        .await
        .unwrap();

    assert_eq!(outcome.termination, Termination::Errored);
    assert_eq!(outcome.steps, 0);
    assert_eq!(case.events().len(), events);
}
