//! Intake stages: normalization, classification and risk screening

use crate::case::{Case, CaseState};
use crate::collaborators::{CollaboratorResult, Collaborators};
use crate::config::PolicyConfig;
use crate::handlers::Handler;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

/// Scrubs PII from the raw text
#[derive(Debug, Default)]
pub struct NormalizationAgent;

impl NormalizationAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for NormalizationAgent {
    fn name(&self) -> &'static str {
        "NormalizationAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::Received
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        let scrubbed = collaborators.scrubber.scrub(&case.raw_text).await?;

        let payload = json!({
            "redactions": scrubbed.redactions.len(),
            "length_before": case.raw_text.chars().count(),
            "length_after": scrubbed.normalized_text.chars().count(),
        });

        case.normalized_text = Some(scrubbed.normalized_text);
        case.redactions = scrubbed.redactions;
        case.state = CaseState::Normalized;
        case.append_event(step, self.name(), "redact+normalize", payload);
        Ok(())
    }
}

/// Assigns product, issue and severity
#[derive(Debug)]
pub struct ClassificationAgent {
    config: Arc<PolicyConfig>,
}

impl ClassificationAgent {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Handler for ClassificationAgent {
    fn name(&self) -> &'static str {
        "ClassificationAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::Normalized
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        let text = case.normalized_text.as_deref().unwrap_or_default();
        let result = collaborators.classifier.classify(text).await?;

        let payload = json!({
            "product": result.product,
            "issue": result.issue,
            "sub_issue": result.sub_issue,
            "severity": result.severity,
            "confidence": result.confidence,
            "needs_human": result.needs_human,
        });

        let escalate =
            result.needs_human || result.confidence < self.config.classification.min_confidence;

        case.product = Some(result.product);
        case.issue = Some(result.issue);
        case.sub_issue = result.sub_issue;
        case.severity = Some(result.severity);
        case.classification_confidence = result.confidence;

        let action = if escalate {
            warn!(
                case_id = %case.case_id,
                confidence = result.confidence,
                "Classification below confidence floor, escalating"
            );
            case.state = CaseState::Escalated;
            "classification_escalated"
        } else {
            case.state = CaseState::Classified;
            "classified"
        };

        case.append_event(step, self.name(), action, payload);
        Ok(())
    }
}

/// Screens for threats, fraud and vulnerability
#[derive(Debug)]
pub struct RiskScreeningAgent {
    config: Arc<PolicyConfig>,
}

impl RiskScreeningAgent {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Handler for RiskScreeningAgent {
    fn name(&self) -> &'static str {
        "RiskScreeningAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::Classified
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        let text = case.normalized_text.as_deref().unwrap_or_default();
        let risk = collaborators.risk_detector.scan_risk(text).await?;

        let payload = json!({
            "flags": risk.flags,
            "vulnerability_flag": risk.vulnerability_flag,
            "confidence": risk.confidence,
        });

        let blocked: Vec<&String> = risk
            .flags
            .iter()
            .filter(|f| self.config.risk.hard_block_flags.contains(*f))
            .collect();
        let escalated = risk
            .flags
            .iter()
            .any(|f| self.config.risk.escalate_flags.contains(f));

        let action = if !blocked.is_empty() {
            warn!(case_id = %case.case_id, flags = ?blocked, "Hard-blocked risk flags detected");
            let message = format!(
                "blocked by risk flags: {}",
                blocked
                    .iter()
                    .map(|f| f.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            case.errors.push(message);
            case.state = CaseState::Error;
            "risk_blocked"
        } else if escalated {
            warn!(case_id = %case.case_id, flags = ?risk.flags, "Risk flags require human review");
            case.state = CaseState::Escalated;
            "risk_escalated"
        } else {
            case.state = CaseState::RiskScreened;
            "risk_screened"
        };

        case.risk_flags = risk.flags;
        case.vulnerability_flag = risk.vulnerability_flag;
        case.append_event(step, self.name(), action, payload);
        Ok(())
    }
}
