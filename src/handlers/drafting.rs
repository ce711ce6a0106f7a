//! Drafting, QA review and the hallucination safety check
//!
//! Only [`DraftingAgent`] creates a draft. QA revision and the safety fallback
//! rewrite the existing draft's content and keep its `draft_id`.

use crate::case::{Case, CaseState, Draft};
use crate::collaborators::{CollaboratorResult, Collaborators, DraftFields};
use crate::config::PolicyConfig;
use crate::handlers::Handler;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

fn new_draft(fields: DraftFields) -> Draft {
    Draft {
        draft_id: Uuid::new_v4(),
        text: fields.draft_response,
        citations: fields.citations,
        disclaimers: fields.disclaimers,
        recommended_actions: fields.recommended_actions,
        tone: fields.tone,
        confidence: fields.confidence,
    }
}

fn rewrite_draft(draft: &mut Draft, fields: DraftFields) {
    draft.text = fields.draft_response;
    draft.citations = fields.citations;
    draft.disclaimers = fields.disclaimers;
    draft.recommended_actions = fields.recommended_actions;
    draft.tone = fields.tone;
    draft.confidence = fields.confidence;
}

#[derive(Debug, Default)]
pub struct DraftingAgent;

impl DraftingAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for DraftingAgent {
    fn name(&self) -> &'static str {
        "DraftingAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::Drafting && case.draft.is_none()
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        let prompt = collaborators.drafting.build_prompt(case);
        let fields = collaborators.drafting.generate(&prompt).await?;

        let payload = json!({
            "confidence": fields.confidence,
            "citations": fields.citations,
        });

        case.draft = Some(new_draft(fields));
        case.state = CaseState::QaReview;
        case.append_event(step, self.name(), "draft_created", payload);
        Ok(())
    }
}

/// Policy review with bounded revision rounds
#[derive(Debug)]
pub struct QaAgent {
    config: Arc<PolicyConfig>,
}

impl QaAgent {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Handler for QaAgent {
    fn name(&self) -> &'static str {
        "QaAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::QaReview
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        if !self.config.orchestrator.enable_guardrails {
            case.state = CaseState::ReadyToSend;
            case.append_event(step, self.name(), "qa_skipped", json!({}));
            return Ok(());
        }

        let report = collaborators.guardrail.validate(case).await?;

        if report.approved {
            case.qa_approved = true;
            case.state = CaseState::ReadyToSend;
            case.append_event(
                step,
                self.name(),
                "qa_approved",
                json!({ "issues": report.issues, "confidence": report.confidence }),
            );
            return Ok(());
        }

        if case.revision_rounds < self.config.drafting.max_revision_rounds {
            let revised = collaborators.drafting.revise(case, &report).await?;
            match case.draft.as_mut() {
                Some(draft) => rewrite_draft(draft, revised),
                None => case.draft = Some(new_draft(revised)),
            }
            case.revision_rounds += 1;
            info!(
                case_id = %case.case_id,
                round = case.revision_rounds,
                issues = ?report.issues,
                "QA requested revision"
            );
            case.append_event(
                step,
                self.name(),
                "revision_requested",
                json!({ "issues": report.issues, "round": case.revision_rounds }),
            );
            return Ok(());
        }

        warn!(
            case_id = %case.case_id,
            issues = ?report.issues,
            "QA issues unresolved after revision limit, proceeding with best-effort draft"
        );
        case.state = CaseState::ReadyToSend;
        case.append_event(
            step,
            self.name(),
            "qa_unresolved",
            json!({
                "issues": report.issues,
                "rounds": case.revision_rounds,
                "unresolved_qa": true,
            }),
        );
        Ok(())
    }
}

/// Replaces poorly grounded drafts with the safe fallback
#[derive(Debug)]
pub struct HallucinationAgent {
    config: Arc<PolicyConfig>,
}

impl HallucinationAgent {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Handler for HallucinationAgent {
    fn name(&self) -> &'static str {
        "HallucinationAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::ReadyToSend && case.draft.is_some()
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        let score = collaborators.hallucination.score_hallucination(case).await?;

        let action = if score > self.config.hallucination.threshold {
            let fallback = collaborators.drafting.safe_fallback(case).await?;
            if let Some(draft) = case.draft.as_mut() {
                rewrite_draft(draft, fallback);
            }
            warn!(case_id = %case.case_id, score, "Draft replaced with safe fallback");
            "fallback_applied"
        } else {
            "hallucination_pass"
        };

        case.hallucination_score = score;
        case.append_event(step, self.name(), action, json!({ "score": score }));
        Ok(())
    }
}
