//! External capabilities consulted by the pipeline handlers
//!
//! Each capability is a narrow async trait so a deployment can swap the
//! heuristic implementations for a model endpoint, a KB index or a messaging
//! gateway without touching the orchestrator. A [`Collaborators`] bundle is
//! built once and shared by every case; implementations must therefore be
//! stateless or internally synchronized.

use crate::case::{Case, PolicyClause, RetrievedDoc, Severity};
use crate::config::PolicyConfig;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod heuristic;
pub mod webhook;

pub use webhook::WebhookDispatcher;

/// Failure reported by a collaborator call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollaboratorError {
    #[error("{capability} unavailable: {message}")]
    Unavailable { capability: String, message: String },

    #[error("{capability} returned an invalid response: {message}")]
    InvalidResponse { capability: String, message: String },

    #[error("{capability} rejected the request: {message}")]
    Rejected { capability: String, message: String },
}

impl CollaboratorError {
    pub fn unavailable(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            capability: capability.into(),
            message: message.into(),
        }
    }

    pub fn invalid_response(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            capability: capability.into(),
            message: message.into(),
        }
    }

    pub fn rejected(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Name of the capability that failed
    pub fn capability(&self) -> &str {
        match self {
            Self::Unavailable { capability, .. }
            | Self::InvalidResponse { capability, .. }
            | Self::Rejected { capability, .. } => capability,
        }
    }
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Output of PII scrubbing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scrubbed {
    pub normalized_text: String,
    /// original fragment -> placeholder
    pub redactions: HashMap<String, String>,
}

/// Taxonomy assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub product: String,
    pub issue: String,
    pub sub_issue: Option<String>,
    pub severity: Severity,
    pub confidence: f64,
    pub needs_human: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub flags: Vec<String>,
    pub vulnerability_flag: bool,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub queue: String,
    pub reason: String,
    /// An acknowledgment draft must be produced before sending
    pub requires_ack: bool,
}

/// Outcome of QA validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaReport {
    pub approved: bool,
    pub issues: Vec<String>,
    pub confidence: f64,
}

/// Draft content as emitted by a drafting model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DraftFields {
    /// Customer-facing response text
    pub draft_response: String,
    /// Policy clause or KB article ids backing the response
    pub citations: Vec<String>,
    pub disclaimers: Vec<String>,
    pub recommended_actions: Vec<String>,
    pub tone: String,
    /// Self-reported confidence in [0, 1]
    pub confidence: f64,
}

impl DraftFields {
    /// JSON schema a model response must satisfy
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(DraftFields);
        serde_json::to_value(schema).unwrap_or_default()
    }

    /// Validate raw model output against the schema and deserialize it
    pub fn from_model_output(raw: &str) -> CollaboratorResult<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| {
            CollaboratorError::invalid_response("drafting", format!("not valid JSON: {e}"))
        })?;

        let schema = Self::json_schema();
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            CollaboratorError::invalid_response(
                "drafting",
                format!("schema compilation error: {e}"),
            )
        })?;

        validator.validate(&value).map_err(|errors| {
            let error_messages: Vec<String> = errors
                .map(|e| format!("At '{}': {}", e.instance_path, e))
                .collect();
            CollaboratorError::invalid_response("drafting", error_messages.join("; "))
        })?;

        let fields: DraftFields = serde_json::from_value(value)
            .map_err(|e| CollaboratorError::invalid_response("drafting", e.to_string()))?;

        if !(0.0..=1.0).contains(&fields.confidence) {
            return Err(CollaboratorError::invalid_response(
                "drafting",
                format!("confidence {} outside [0, 1]", fields.confidence),
            ));
        }

        Ok(fields)
    }
}

#[async_trait]
pub trait PiiScrubber: Send + Sync {
    async fn scrub(&self, text: &str) -> CollaboratorResult<Scrubbed>;
}

#[async_trait]
pub trait TaxonomyClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> CollaboratorResult<Classification>;
}

#[async_trait]
pub trait RiskDetector: Send + Sync {
    async fn scan_risk(&self, text: &str) -> CollaboratorResult<RiskAssessment>;
}

#[async_trait]
pub trait RoutingEngine: Send + Sync {
    async fn assign_route(&self, case: &Case) -> CollaboratorResult<RouteAssignment>;
}

#[async_trait]
pub trait DocumentRetriever: Send + Sync {
    /// Fetch at most `k` documents matching any of the taxonomy filters
    async fn fetch_docs(&self, filters: &[String], k: usize)
        -> CollaboratorResult<Vec<RetrievedDoc>>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get_policy_clauses(
        &self,
        product: Option<&str>,
        issue: Option<&str>,
    ) -> CollaboratorResult<Vec<PolicyClause>>;
}

/// Response drafting model
#[async_trait]
pub trait DraftingModel: Send + Sync {
    fn build_prompt(&self, case: &Case) -> String;

    async fn generate(&self, prompt: &str) -> CollaboratorResult<DraftFields>;

    /// Conservative acknowledgment used when a draft fails the safety check
    async fn safe_fallback(&self, case: &Case) -> CollaboratorResult<DraftFields>;

    /// Produce an improved draft addressing a QA report
    async fn revise(&self, case: &Case, report: &QaReport) -> CollaboratorResult<DraftFields>;
}

#[async_trait]
pub trait QaGuardrail: Send + Sync {
    async fn validate(&self, case: &Case) -> CollaboratorResult<QaReport>;
}

#[async_trait]
pub trait HallucinationScorer: Send + Sync {
    /// Risk score in [0, 1]; higher means less grounded
    async fn score_hallucination(&self, case: &Case) -> CollaboratorResult<f64>;
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn send(&self, case: &Case) -> CollaboratorResult<()>;
}

#[async_trait]
pub trait FeedbackCollector: Send + Sync {
    async fn record_feedback(&self, case: &Case) -> CollaboratorResult<()>;
}

/// One instance of every capability, shared across cases
#[derive(Clone)]
pub struct Collaborators {
    pub scrubber: Arc<dyn PiiScrubber>,
    pub classifier: Arc<dyn TaxonomyClassifier>,
    pub risk_detector: Arc<dyn RiskDetector>,
    pub routing: Arc<dyn RoutingEngine>,
    pub retriever: Arc<dyn DocumentRetriever>,
    pub policy_store: Arc<dyn PolicyStore>,
    pub drafting: Arc<dyn DraftingModel>,
    pub guardrail: Arc<dyn QaGuardrail>,
    pub hallucination: Arc<dyn HallucinationScorer>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub feedback: Arc<dyn FeedbackCollector>,
}

impl Collaborators {
    /// Deterministic rule-based bundle
    pub fn heuristic(config: &PolicyConfig) -> Self {
        Self {
            scrubber: Arc::new(heuristic::RegexPiiScrubber::new()),
            classifier: Arc::new(heuristic::KeywordClassifier::new(
                config.classification.min_confidence,
            )),
            risk_detector: Arc::new(heuristic::KeywordRiskDetector::new()),
            routing: Arc::new(heuristic::RuleRoutingEngine::new()),
            retriever: Arc::new(heuristic::InMemoryKnowledgeBase::new()),
            policy_store: Arc::new(heuristic::InMemoryPolicyStore::new()),
            drafting: Arc::new(heuristic::TemplateDraftingModel::new()),
            guardrail: Arc::new(heuristic::RuleQaGuardrail::new(
                config.drafting.min_confidence,
            )),
            hallucination: Arc::new(heuristic::HeuristicHallucinationScorer::new()),
            dispatcher: Arc::new(heuristic::LoggingDispatcher::new()),
            feedback: Arc::new(heuristic::InMemoryFeedbackCollector::new()),
        }
    }

    /// Heuristic bundle with the webhook dispatcher when one is configured
    pub fn from_config(config: &PolicyConfig) -> Self {
        let collaborators = Self::heuristic(config);
        match &config.dispatch {
            Some(dispatch) => {
                collaborators.with_dispatcher(Arc::new(WebhookDispatcher::new(dispatch.clone())))
            }
            None => collaborators,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn with_feedback(mut self, feedback: Arc<dyn FeedbackCollector>) -> Self {
        self.feedback = feedback;
        self
    }
}
