//! Run summaries and per-case reports

use crate::case::{Case, CaseState};
use serde::Serialize;

/// Aggregate view over a batch of processed cases
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    /// Closed with a response delivered
    pub sent: usize,
    /// Handed to a human at any point
    pub escalated: usize,
    pub errored: usize,
    /// Mean draft confidence over cases that have a draft, rounded to 3 places
    pub avg_draft_confidence: f64,
}

impl RunSummary {
    pub fn from_cases(cases: &[Case]) -> Self {
        let confidences: Vec<f64> = cases
            .iter()
            .filter_map(|c| c.draft.as_ref().map(|d| d.confidence))
            .collect();
        let avg = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f64>() / confidences.len() as f64
        };

        Self {
            total: cases.len(),
            sent: cases
                .iter()
                .filter(|c| c.state == CaseState::Closed && c.final_response_sent)
                .count(),
            escalated: cases
                .iter()
                .filter(|c| c.has_visited(CaseState::Escalated))
                .count(),
            errored: cases.iter().filter(|c| c.state == CaseState::Error).count(),
            avg_draft_confidence: (avg * 1000.0).round() / 1000.0,
        }
    }
}

/// One row of the `--output` report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseReport {
    pub case_id: String,
    pub state: CaseState,
    pub product: Option<String>,
    pub issue: Option<String>,
    pub risk_flags: Vec<String>,
    pub routing_queue: Option<String>,
    pub draft_confidence: Option<f64>,
}

impl From<&Case> for CaseReport {
    fn from(case: &Case) -> Self {
        Self {
            case_id: case.case_id.clone(),
            state: case.state,
            product: case.product.clone(),
            issue: case.issue.clone(),
            risk_flags: case.risk_flags.clone(),
            routing_queue: case.routing_queue.clone(),
            draft_confidence: case.draft.as_ref().map(|d| d.confidence),
        }
    }
}
