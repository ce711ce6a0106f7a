//! Scripted collaborators for tests
//!
//! [`ScriptedCollaborators`] starts from the heuristic bundle and lets a test
//! pin individual outputs or make a capability fail.

use crate::case::{Case, PolicyClause, RetrievedDoc};
use crate::collaborators::heuristic::{InMemoryFeedbackCollector, LoggingDispatcher};
use crate::collaborators::{
    Classification, CollaboratorError, CollaboratorResult, Collaborators, Dispatcher,
    DocumentRetriever, DraftFields, DraftingModel, FeedbackCollector, HallucinationScorer,
    PiiScrubber, PolicyStore, QaGuardrail, QaReport, RiskAssessment, RiskDetector,
    RouteAssignment, RoutingEngine, Scrubbed, TaxonomyClassifier,
};
use crate::config::PolicyConfig;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Collaborator capabilities that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Scrubber,
    Classifier,
    RiskDetector,
    Routing,
    Retriever,
    PolicyStore,
    Drafting,
    Guardrail,
    Hallucination,
    Dispatcher,
    Feedback,
}

impl Capability {
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Scrubber => "scrubber",
            Capability::Classifier => "classifier",
            Capability::RiskDetector => "risk_detector",
            Capability::Routing => "routing",
            Capability::Retriever => "retriever",
            Capability::PolicyStore => "policy_store",
            Capability::Drafting => "drafting",
            Capability::Guardrail => "guardrail",
            Capability::Hallucination => "hallucination",
            Capability::Dispatcher => "dispatcher",
            Capability::Feedback => "feedback",
        }
    }
}

/// Returns `Unavailable` from every call
#[derive(Debug, Clone)]
pub struct FailingCollaborator {
    capability: &'static str,
    message: String,
}

impl FailingCollaborator {
    pub fn new(capability: Capability, message: impl Into<String>) -> Self {
        Self {
            capability: capability.as_str(),
            message: message.into(),
        }
    }

    fn fail<T>(&self) -> CollaboratorResult<T> {
        Err(CollaboratorError::unavailable(
            self.capability,
            self.message.clone(),
        ))
    }
}

#[async_trait]
impl PiiScrubber for FailingCollaborator {
    async fn scrub(&self, _text: &str) -> CollaboratorResult<Scrubbed> {
        self.fail()
    }
}

#[async_trait]
impl TaxonomyClassifier for FailingCollaborator {
    async fn classify(&self, _text: &str) -> CollaboratorResult<Classification> {
        self.fail()
    }
}

#[async_trait]
impl RiskDetector for FailingCollaborator {
    async fn scan_risk(&self, _text: &str) -> CollaboratorResult<RiskAssessment> {
        self.fail()
    }
}

#[async_trait]
impl RoutingEngine for FailingCollaborator {
    async fn assign_route(&self, _case: &Case) -> CollaboratorResult<RouteAssignment> {
        self.fail()
    }
}

#[async_trait]
impl DocumentRetriever for FailingCollaborator {
    async fn fetch_docs(
        &self,
        _filters: &[String],
        _k: usize,
    ) -> CollaboratorResult<Vec<RetrievedDoc>> {
        self.fail()
    }
}

#[async_trait]
impl PolicyStore for FailingCollaborator {
    async fn get_policy_clauses(
        &self,
        _product: Option<&str>,
        _issue: Option<&str>,
    ) -> CollaboratorResult<Vec<PolicyClause>> {
        self.fail()
    }
}

#[async_trait]
impl DraftingModel for FailingCollaborator {
    fn build_prompt(&self, _case: &Case) -> String {
        String::new()
    }

    async fn generate(&self, _prompt: &str) -> CollaboratorResult<DraftFields> {
        self.fail()
    }

    async fn safe_fallback(&self, _case: &Case) -> CollaboratorResult<DraftFields> {
        self.fail()
    }

    async fn revise(&self, _case: &Case, _report: &QaReport) -> CollaboratorResult<DraftFields> {
        self.fail()
    }
}

#[async_trait]
impl QaGuardrail for FailingCollaborator {
    async fn validate(&self, _case: &Case) -> CollaboratorResult<QaReport> {
        self.fail()
    }
}

#[async_trait]
impl HallucinationScorer for FailingCollaborator {
    async fn score_hallucination(&self, _case: &Case) -> CollaboratorResult<f64> {
        self.fail()
    }
}

#[async_trait]
impl Dispatcher for FailingCollaborator {
    async fn send(&self, _case: &Case) -> CollaboratorResult<()> {
        self.fail()
    }
}

#[async_trait]
impl FeedbackCollector for FailingCollaborator {
    async fn record_feedback(&self, _case: &Case) -> CollaboratorResult<()> {
        self.fail()
    }
}

#[derive(Debug, Clone)]
pub struct FixedClassifier(pub Classification);

#[async_trait]
impl TaxonomyClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> CollaboratorResult<Classification> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FixedRoute(pub RouteAssignment);

#[async_trait]
impl RoutingEngine for FixedRoute {
    async fn assign_route(&self, _case: &Case) -> CollaboratorResult<RouteAssignment> {
        Ok(self.0.clone())
    }
}

/// Same report for every validation; counts calls
#[derive(Debug)]
pub struct FixedGuardrail {
    report: QaReport,
    calls: AtomicUsize,
}

impl FixedGuardrail {
    pub fn new(report: QaReport) -> Self {
        Self {
            report,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QaGuardrail for FixedGuardrail {
    async fn validate(&self, _case: &Case) -> CollaboratorResult<QaReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.report.clone())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedHallucinationScore(pub f64);

#[async_trait]
impl HallucinationScorer for FixedHallucinationScore {
    async fn score_hallucination(&self, _case: &Case) -> CollaboratorResult<f64> {
        Ok(self.0)
    }
}

/// Emits fixed draft fields, delegating fallback and revision
pub struct FixedDraft {
    fields: DraftFields,
    inner: Arc<dyn DraftingModel>,
}

impl FixedDraft {
    pub fn new(fields: DraftFields, inner: Arc<dyn DraftingModel>) -> Self {
        Self { fields, inner }
    }
}

#[async_trait]
impl DraftingModel for FixedDraft {
    fn build_prompt(&self, case: &Case) -> String {
        self.inner.build_prompt(case)
    }

    async fn generate(&self, _prompt: &str) -> CollaboratorResult<DraftFields> {
        Ok(self.fields.clone())
    }

    async fn safe_fallback(&self, case: &Case) -> CollaboratorResult<DraftFields> {
        self.inner.safe_fallback(case).await
    }

    async fn revise(&self, case: &Case, report: &QaReport) -> CollaboratorResult<DraftFields> {
        self.inner.revise(case, report).await
    }
}

/// Builder over the heuristic bundle with pinned outputs and injected failures
pub struct ScriptedCollaborators {
    collaborators: Collaborators,
    dispatcher: Arc<LoggingDispatcher>,
    feedback: Arc<InMemoryFeedbackCollector>,
}

impl ScriptedCollaborators {
    pub fn new(config: &PolicyConfig) -> Self {
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let feedback = Arc::new(InMemoryFeedbackCollector::new());
        let collaborators = Collaborators::heuristic(config)
            .with_dispatcher(dispatcher.clone())
            .with_feedback(feedback.clone());

        Self {
            collaborators,
            dispatcher,
            feedback,
        }
    }

    pub fn classification(mut self, classification: Classification) -> Self {
        self.collaborators.classifier = Arc::new(FixedClassifier(classification));
        self
    }

    pub fn route(mut self, route: RouteAssignment) -> Self {
        self.collaborators.routing = Arc::new(FixedRoute(route));
        self
    }

    pub fn draft(mut self, fields: DraftFields) -> Self {
        let inner = self.collaborators.drafting.clone();
        self.collaborators.drafting = Arc::new(FixedDraft::new(fields, inner));
        self
    }

    pub fn guardrail(mut self, guardrail: Arc<FixedGuardrail>) -> Self {
        self.collaborators.guardrail = guardrail;
        self
    }

    pub fn hallucination_score(mut self, score: f64) -> Self {
        self.collaborators.hallucination = Arc::new(FixedHallucinationScore(score));
        self
    }

    /// Make every call to `capability` fail with `Unavailable`
    pub fn failing(mut self, capability: Capability, message: &str) -> Self {
        let failing = Arc::new(FailingCollaborator::new(capability, message));
        let c = &mut self.collaborators;
        match capability {
            Capability::Scrubber => c.scrubber = failing,
            Capability::Classifier => c.classifier = failing,
            Capability::RiskDetector => c.risk_detector = failing,
            Capability::Routing => c.routing = failing,
            Capability::Retriever => c.retriever = failing,
            Capability::PolicyStore => c.policy_store = failing,
            Capability::Drafting => c.drafting = failing,
            Capability::Guardrail => c.guardrail = failing,
            Capability::Hallucination => c.hallucination = failing,
            Capability::Dispatcher => c.dispatcher = failing,
            Capability::Feedback => c.feedback = failing,
        }
        self
    }

    /// Dispatcher that records delivered case ids
    pub fn dispatcher(&self) -> Arc<LoggingDispatcher> {
        self.dispatcher.clone()
    }

    pub fn feedback(&self) -> Arc<InMemoryFeedbackCollector> {
        self.feedback.clone()
    }

    pub fn build(&self) -> Collaborators {
        self.collaborators.clone()
    }
}
