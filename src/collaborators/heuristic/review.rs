//! Draft review rules: QA guardrail and hallucination scoring

use crate::case::Case;
use crate::collaborators::{CollaboratorResult, HallucinationScorer, QaGuardrail, QaReport};
use async_trait::async_trait;

const DISPUTE_ISSUE: &str = "UNAUTHORIZED_TRANSACTION";
const DISCLAIMER_MARKER: &str = "acknowledgment does not constitute";
const BANNED_PHRASE: &str = "guarantee full refund";
const TIMELINE_PHRASE: &str = "within 10 business days";
const TIMELINE_CITATION: &str = "policy_refund_v4#clause2";

/// Policy rules every outbound draft must satisfy
#[derive(Debug)]
pub struct RuleQaGuardrail {
    min_confidence: f64,
}

impl RuleQaGuardrail {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

#[async_trait]
impl QaGuardrail for RuleQaGuardrail {
    async fn validate(&self, case: &Case) -> CollaboratorResult<QaReport> {
        let Some(draft) = case.draft.as_ref() else {
            return Ok(QaReport {
                approved: false,
                issues: vec!["missing_draft".to_string()],
                confidence: 0.0,
            });
        };

        let mut issues = Vec::new();
        let text = draft.text.to_lowercase();

        if case.issue.as_deref() == Some(DISPUTE_ISSUE)
            && !draft
                .disclaimers
                .iter()
                .any(|d| d.to_lowercase().contains(DISCLAIMER_MARKER))
        {
            issues.push("missing_disclaimer".to_string());
        }

        if text.contains(BANNED_PHRASE) {
            issues.push("banned_phrase_guarantee_refund".to_string());
        }

        if text.contains(TIMELINE_PHRASE)
            && !draft.citations.iter().any(|c| c.contains(TIMELINE_CITATION))
        {
            issues.push("missing_citation_for_timeline".to_string());
        }

        Ok(QaReport {
            approved: issues.is_empty() && draft.confidence >= self.min_confidence,
            issues,
            confidence: draft.confidence,
        })
    }
}

/// Flags uncited timelines and promises
#[derive(Debug, Default)]
pub struct HeuristicHallucinationScorer;

impl HeuristicHallucinationScorer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HallucinationScorer for HeuristicHallucinationScorer {
    async fn score_hallucination(&self, case: &Case) -> CollaboratorResult<f64> {
        let Some(draft) = case.draft.as_ref() else {
            return Ok(1.0);
        };

        let mut score: f64 = 0.0;
        if draft.text.contains("business days") && draft.citations.is_empty() {
            score += 0.3;
        }
        if draft.text.to_lowercase().contains("guarantee") {
            score += 0.4;
        }
        Ok(score.min(1.0))
    }
}
