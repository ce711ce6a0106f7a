//! Outbound dispatch and case closure

use crate::case::{Case, CaseState};
use crate::collaborators::{CollaboratorResult, Collaborators};
use crate::handlers::Handler;
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Default)]
pub struct DispatchAgent;

impl DispatchAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for DispatchAgent {
    fn name(&self) -> &'static str {
        "DispatchAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::ReadyToSend && case.draft.is_some() && !case.final_response_sent
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        collaborators.dispatcher.send(case).await?;

        let length = case
            .draft
            .as_ref()
            .map(|d| d.text.chars().count())
            .unwrap_or_default();

        case.final_response_sent = true;
        case.state = CaseState::Sent;
        case.append_event(
            step,
            self.name(),
            "dispatched",
            json!({ "queue": case.routing_queue, "length": length }),
        );
        Ok(())
    }
}

/// Records outcome feedback and closes the case
#[derive(Debug, Default)]
pub struct FeedbackAgent;

impl FeedbackAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for FeedbackAgent {
    fn name(&self) -> &'static str {
        "FeedbackAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state.is_outcome()
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        collaborators.feedback.record_feedback(case).await?;

        let outcome = case.state;
        case.state = CaseState::Closed;
        case.append_event(
            step,
            self.name(),
            "case_closed",
            json!({ "status": "closed", "outcome": outcome }),
        );
        Ok(())
    }
}
