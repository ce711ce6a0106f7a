//! Case orchestration loop
//!
//! The orchestrator owns no business logic. Each pass it scans the handler
//! list in registration order and runs every handler whose guard accepts the
//! case, so a later handler sees what an earlier one did in the same pass.
//! After every run it verifies the handler contract (one event appended,
//! event state matches the case, transition legal) and applies the one-time
//! SLA rule. A case ends when it reaches CLOSED or ERROR, when a pass runs
//! nothing, or when the step budget runs out.

use crate::case::{Case, CaseState};
use crate::collaborators::{CollaboratorError, Collaborators};
use crate::config::PolicyConfig;
use crate::error::sanitize_error_message;
use crate::handlers::{default_handlers, Handler};
use crate::observability::metrics;
use crate::{case_span, handler_span};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn, Instrument};

/// Handler name recorded on events the orchestrator appends itself
pub const ORCHESTRATOR_HANDLER: &str = "Orchestrator";

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("handler {handler} failed at step {step}: {source}")]
    HandlerFailed {
        handler: String,
        step: u32,
        source: CollaboratorError,
    },

    #[error("handler {handler} broke its contract at step {step}: {message}")]
    ContractViolation {
        handler: String,
        step: u32,
        message: String,
    },
}

/// Why processing stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Closed,
    Errored,
    /// A pass ran no handler while the case was not terminal
    Stalled,
    StepBudgetExhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessOutcome {
    /// Passes started
    pub steps: u32,
    /// Handler executions across all passes
    pub handler_runs: u32,
    pub termination: Termination,
}

impl ProcessOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self.termination, Termination::Closed | Termination::Errored)
    }
}

/// A case after processing, with the orchestrator's verdict
#[derive(Debug)]
pub struct CaseRun {
    pub case: Case,
    pub result: Result<ProcessOutcome, OrchestratorError>,
}

pub struct Orchestrator {
    config: Arc<PolicyConfig>,
    handlers: Vec<Box<dyn Handler>>,
}

impl Orchestrator {
    pub fn new(config: Arc<PolicyConfig>, handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { config, handlers }
    }

    /// Orchestrator with the ten pipeline handlers
    pub fn with_default_handlers(config: Arc<PolicyConfig>) -> Self {
        let handlers = default_handlers(config.clone());
        Self::new(config, handlers)
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Drive one case until it terminates, stalls or exhausts the step budget.
    ///
    /// On a collaborator failure the case is left in ERROR with the failure
    /// recorded on it, and the error is returned.
    pub async fn process(
        &self,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> Result<ProcessOutcome, OrchestratorError> {
        let span = case_span!(case_id = %case.case_id, channel = %case.channel);
        async {
            let started = Instant::now();
            metrics().case_received();

            let result = self.run_passes(case, collaborators).await;

            metrics().case_processing_time(started.elapsed());
            match &result {
                Ok(outcome) => self.report_outcome(case, outcome),
                Err(e) => {
                    metrics().case_errored();
                    error!(error = %e, state = %case.state, "Case processing failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    /// Process many cases concurrently, preserving input order
    pub async fn process_all(&self, cases: Vec<Case>, collaborators: &Collaborators) -> Vec<CaseRun> {
        let runs = cases.into_iter().map(|mut case| async move {
            let result = self.process(&mut case, collaborators).await;
            CaseRun { case, result }
        });
        join_all(runs).await
    }

    async fn run_passes(
        &self,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> Result<ProcessOutcome, OrchestratorError> {
        let mut steps = 0;
        let mut handler_runs = 0;

        if let Some(termination) = terminal_outcome(case) {
            return Ok(ProcessOutcome {
                steps,
                handler_runs,
                termination,
            });
        }

        while steps < self.config.orchestrator.max_total_steps {
            steps += 1;
            self.apply_sla(case);

            let mut ran_this_pass = 0;
            for handler in &self.handlers {
                if !handler.eligible(case) {
                    continue;
                }

                self.run_handler(handler.as_ref(), steps, case, collaborators)
                    .await?;
                ran_this_pass += 1;
                handler_runs += 1;
                self.apply_sla(case);

                if let Some(termination) = terminal_outcome(case) {
                    metrics().pass_completed();
                    return Ok(ProcessOutcome {
                        steps,
                        handler_runs,
                        termination,
                    });
                }
            }
            metrics().pass_completed();

            if case.state.is_outcome() {
                continue;
            }
            if ran_this_pass == 0 {
                return Ok(ProcessOutcome {
                    steps,
                    handler_runs,
                    termination: Termination::Stalled,
                });
            }
        }

        Ok(ProcessOutcome {
            steps,
            handler_runs,
            termination: Termination::StepBudgetExhausted,
        })
    }

    async fn run_handler(
        &self,
        handler: &dyn Handler,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> Result<(), OrchestratorError> {
        let name = handler.name();
        let state_before = case.state;
        let events_before = case.events().len();

        debug!(handler = name, step, state = %state_before, "Running handler");

        let started = Instant::now();
        let result = handler
            .act(step, case, collaborators)
            .instrument(handler_span!(handler = name, step))
            .await;
        metrics().handler_executed(name, started.elapsed(), result.is_ok());

        if let Err(source) = result {
            self.record_failure(name, step, case, &source);
            return Err(OrchestratorError::HandlerFailed {
                handler: name.to_string(),
                step,
                source,
            });
        }

        verify_contract(name, step, state_before, events_before, case)?;

        if case.state != state_before {
            info!(
                handler = name,
                step,
                from = %state_before,
                to = %case.state,
                "Case state transition"
            );
        }
        Ok(())
    }

    fn record_failure(&self, handler: &str, step: u32, case: &mut Case, source: &CollaboratorError) {
        let message = sanitize_error_message(&source.to_string());
        warn!(handler, step, error = %message, "Handler failed, moving case to ERROR");

        case.errors.push(format!("{handler}: {message}"));
        if !case.is_terminal() {
            case.state = CaseState::Error;
        }
        case.append_event(
            step,
            ORCHESTRATOR_HANDLER,
            "handler_failed",
            json!({ "handler": handler, "error": message }),
        );
    }

    /// Set the SLA deadline once, the first time a classified case has a severity
    fn apply_sla(&self, case: &mut Case) {
        if case.state != CaseState::Classified || case.sla_deadline.is_some() {
            return;
        }
        if let Some(severity) = case.severity {
            let deadline = self.config.compute_sla_deadline(case.created_at, severity);
            debug!(severity = %severity, deadline = %deadline, "SLA deadline assigned");
            case.sla_deadline = Some(deadline);
        }
    }

    fn report_outcome(&self, case: &Case, outcome: &ProcessOutcome) {
        let collector = metrics();
        match outcome.termination {
            Termination::Closed => collector.case_closed(),
            Termination::Errored => collector.case_errored(),
            Termination::Stalled => {
                collector.case_stalled();
                warn!(
                    state = %case.state,
                    steps = outcome.steps,
                    "No handler eligible, case stalled"
                );
            }
            Termination::StepBudgetExhausted => {
                collector.case_step_budget_exhausted();
                warn!(
                    state = %case.state,
                    max_total_steps = self.config.orchestrator.max_total_steps,
                    "Step budget exhausted before case terminated"
                );
            }
        }
        if case.final_response_sent {
            collector.response_sent();
        }
        if case.has_visited(CaseState::Escalated) {
            collector.case_escalated();
        }

        info!(
            state = %case.state,
            termination = ?outcome.termination,
            steps = outcome.steps,
            handler_runs = outcome.handler_runs,
            sent = case.final_response_sent,
            "Case processing finished"
        );
    }
}

fn terminal_outcome(case: &Case) -> Option<Termination> {
    match case.state {
        CaseState::Closed => Some(Termination::Closed),
        CaseState::Error => Some(Termination::Errored),
        _ => None,
    }
}

fn verify_contract(
    handler: &str,
    step: u32,
    state_before: CaseState,
    events_before: usize,
    case: &Case,
) -> Result<(), OrchestratorError> {
    let violation = |message: String| OrchestratorError::ContractViolation {
        handler: handler.to_string(),
        step,
        message,
    };

    let appended = case.events().len().saturating_sub(events_before);
    if appended != 1 {
        return Err(violation(format!("expected one event, found {appended}")));
    }

    if let Some(event) = case.last_event() {
        if event.state_entered() != case.state.as_str() {
            return Err(violation(format!(
                "event recorded {} but case is {}",
                event.state_entered(),
                case.state
            )));
        }
    }

    if !state_before.can_transition_to(case.state) {
        return Err(violation(format!(
            "illegal transition {state_before} -> {}",
            case.state
        )));
    }

    Ok(())
}
