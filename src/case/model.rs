//! Case record, draft artifact and audit events

use super::state::CaseState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Severity assigned by classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Med,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Med => "MED",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }

    /// HIGH and CRITICAL use the shorter SLA table
    pub fn is_elevated(self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knowledge-base article returned by retrieval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDoc {
    pub id: String,
    pub taxonomy: Vec<String>,
    pub summary: String,
    /// Relevance in [0, 1]
    pub score: f64,
}

/// Policy clause applicable to a product/issue pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyClause {
    pub id: String,
    pub product: Option<String>,
    pub issue: Option<String>,
    pub text: String,
    pub version: String,
}

/// Response draft owned by a case.
///
/// `draft_id` is assigned when drafting creates the artifact and survives QA
/// revisions and the safety fallback, which only rewrite content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub draft_id: Uuid,
    pub text: String,
    pub citations: Vec<String>,
    pub disclaimers: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub tone: String,
    pub confidence: f64,
}

/// Immutable audit record. Only [`Case::append_event`] creates these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    step: u32,
    handler: String,
    action: String,
    state_entered: String,
    payload: Value,
    timestamp: DateTime<Utc>,
}

impl Event {
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn state_entered(&self) -> &str {
        &self.state_entered
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Equality on everything except the wall-clock timestamp
    pub fn same_record(&self, other: &Event) -> bool {
        self.step == other.step
            && self.handler == other.handler
            && self.action == other.action
            && self.state_entered == other.state_entered
            && self.payload == other.payload
    }
}

/// One complaint moving through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub case_id: String,
    pub raw_text: String,
    pub channel: String,
    pub language: String,

    pub normalized_text: Option<String>,
    #[serde(default)]
    pub redactions: HashMap<String, String>,

    pub product: Option<String>,
    pub issue: Option<String>,
    pub sub_issue: Option<String>,
    pub severity: Option<Severity>,
    pub classification_confidence: f64,

    pub risk_flags: Vec<String>,
    pub vulnerability_flag: bool,

    pub routing_queue: Option<String>,
    pub routing_reason: Option<String>,
    pub policy_version_pin: Option<String>,

    pub retrieval_docs: Vec<RetrievedDoc>,
    pub retrieval_policies: Vec<PolicyClause>,

    pub draft: Option<Draft>,
    pub qa_approved: bool,
    pub hallucination_score: f64,
    pub revision_rounds: u32,

    pub sla_deadline: Option<DateTime<Utc>>,
    pub final_response_sent: bool,

    pub state: CaseState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    event_log: Vec<Event>,
    pub errors: Vec<String>,
}

impl Case {
    /// Create a freshly received case
    pub fn new(
        case_id: impl Into<String>,
        raw_text: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            case_id: case_id.into(),
            raw_text: raw_text.into(),
            channel: channel.into(),
            language: "en".to_string(),
            normalized_text: None,
            redactions: HashMap::new(),
            product: None,
            issue: None,
            sub_issue: None,
            severity: None,
            classification_confidence: 0.0,
            risk_flags: Vec::new(),
            vulnerability_flag: false,
            routing_queue: None,
            routing_reason: None,
            policy_version_pin: None,
            retrieval_docs: Vec::new(),
            retrieval_policies: Vec::new(),
            draft: None,
            qa_approved: false,
            hallucination_score: 0.0,
            revision_rounds: 0,
            sla_deadline: None,
            final_response_sent: false,
            state: CaseState::Received,
            created_at: now,
            updated_at: now,
            event_log: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Set the input language (defaults to `en`)
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Append an audit event stamped with the current state
    pub fn append_event(&mut self, step: u32, handler: &str, action: &str, payload: Value) {
        let now = Utc::now();
        self.event_log.push(Event {
            step,
            handler: handler.to_string(),
            action: action.to_string(),
            state_entered: self.state.as_str().to_string(),
            payload,
            timestamp: now,
        });
        self.updated_at = now;
    }

    /// The full audit trail, oldest first
    pub fn events(&self) -> &[Event] {
        &self.event_log
    }

    pub fn last_event(&self) -> Option<&Event> {
        self.event_log.last()
    }

    /// Events recorded by one handler
    pub fn events_by<'a>(&'a self, handler: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.event_log.iter().filter(move |e| e.handler == handler)
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Whether the audit trail shows the case passed through `state`
    pub fn has_visited(&self, state: CaseState) -> bool {
        self.event_log
            .iter()
            .any(|e| e.state_entered == state.as_str())
    }
}
