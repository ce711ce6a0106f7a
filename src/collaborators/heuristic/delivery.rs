//! Outbound delivery and feedback capture without external systems

use crate::case::{Case, CaseState};
use crate::collaborators::{CollaboratorError, CollaboratorResult, Dispatcher, FeedbackCollector};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;
use tracing::info;

/// Records sent case ids and logs the delivery
#[derive(Debug, Default)]
pub struct LoggingDispatcher {
    sent: Mutex<Vec<String>>,
}

impl LoggingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case ids delivered so far, in order
    pub fn sent_case_ids(&self) -> Vec<String> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Dispatcher for LoggingDispatcher {
    async fn send(&self, case: &Case) -> CollaboratorResult<()> {
        let draft = case.draft.as_ref().ok_or_else(|| {
            CollaboratorError::rejected("dispatcher", "case has no draft to send")
        })?;

        info!(
            case_id = %case.case_id,
            queue = case.routing_queue.as_deref().unwrap_or("unassigned"),
            channel = %case.channel,
            length = draft.text.len(),
            "Dispatching response"
        );

        self.sent
            .lock()
            .map_err(|_| CollaboratorError::unavailable("dispatcher", "delivery log poisoned"))?
            .push(case.case_id.clone());
        Ok(())
    }
}

/// Outcome metrics captured when a case closes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub case_id: String,
    pub outcome: CaseState,
    pub final_response_sent: bool,
    pub revision_rounds: u32,
    pub hallucination_score: f64,
    pub qa_approved: bool,
    pub routing_queue: Option<String>,
}

#[derive(Debug, Default)]
pub struct InMemoryFeedbackCollector {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl InMemoryFeedbackCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FeedbackRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FeedbackCollector for InMemoryFeedbackCollector {
    async fn record_feedback(&self, case: &Case) -> CollaboratorResult<()> {
        let record = FeedbackRecord {
            case_id: case.case_id.clone(),
            outcome: case.state,
            final_response_sent: case.final_response_sent,
            revision_rounds: case.revision_rounds,
            hallucination_score: case.hallucination_score,
            qa_approved: case.qa_approved,
            routing_queue: case.routing_queue.clone(),
        };

        self.records
            .lock()
            .map_err(|_| CollaboratorError::unavailable("feedback", "record store poisoned"))?
            .push(record);
        Ok(())
    }
}
