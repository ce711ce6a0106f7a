//! Queue assignment and knowledge retrieval

use crate::case::{Case, CaseState};
use crate::collaborators::{CollaboratorResult, Collaborators};
use crate::config::PolicyConfig;
use crate::handlers::Handler;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct RoutingAgent;

impl RoutingAgent {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Handler for RoutingAgent {
    fn name(&self) -> &'static str {
        "RoutingAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::RiskScreened
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        let route = collaborators.routing.assign_route(case).await?;

        let payload = json!({
            "queue": route.queue,
            "reason": route.reason,
            "requires_ack": route.requires_ack,
        });

        case.routing_queue = Some(route.queue);
        case.routing_reason = Some(route.reason);
        case.state = if route.requires_ack {
            CaseState::RoutingPending
        } else {
            CaseState::ReadyToSend
        };
        case.append_event(step, self.name(), "routing_decision", payload);
        Ok(())
    }
}

/// Gathers KB articles and policy clauses for drafting
#[derive(Debug)]
pub struct RetrievalAgent {
    config: Arc<PolicyConfig>,
}

impl RetrievalAgent {
    pub fn new(config: Arc<PolicyConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Handler for RetrievalAgent {
    fn name(&self) -> &'static str {
        "RetrievalAgent"
    }

    fn eligible(&self, case: &Case) -> bool {
        case.state == CaseState::RoutingPending && case.retrieval_docs.is_empty()
    }

    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()> {
        let filters: Vec<String> = [case.product.clone(), case.issue.clone()]
            .into_iter()
            .flatten()
            .collect();

        let fetched = collaborators
            .retriever
            .fetch_docs(&filters, self.config.retrieval.top_k)
            .await?;
        let min_score = self.config.retrieval.min_doc_confidence;
        let docs: Vec<_> = fetched.into_iter().filter(|d| d.score >= min_score).collect();

        let policies = collaborators
            .policy_store
            .get_policy_clauses(case.product.as_deref(), case.issue.as_deref())
            .await?;

        debug!(
            case_id = %case.case_id,
            docs = docs.len(),
            policies = policies.len(),
            "Retrieved supporting material"
        );

        let payload = json!({
            "doc_ids": docs.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            "policy_ids": policies.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        });

        case.policy_version_pin = policies.iter().map(|p| p.version.clone()).max();
        case.retrieval_docs = docs;
        case.retrieval_policies = policies;
        case.state = CaseState::Drafting;
        case.append_event(step, self.name(), "retrieval_done", payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screened_case(product: &str, issue: &str) -> Case {
        let mut case = Case::new("C1", "text", "web_form");
        case.product = Some(product.to_string());
        case.issue = Some(issue.to_string());
        case.state = CaseState::RiskScreened;
        case
    }

    #[tokio::test]
    async fn test_routing_assigns_dispute_queue() {
        let collaborators = Collaborators::heuristic(&PolicyConfig::default());
        let mut case = screened_case("DEBIT_CARD", "UNAUTHORIZED_TRANSACTION");

        RoutingAgent::new()
            .act(1, &mut case, &collaborators)
            .await
            .unwrap();

        assert_eq!(case.state, CaseState::RoutingPending);
        assert_eq!(case.routing_queue.as_deref(), Some("CardDisputes"));
        let event = case.last_event().unwrap();
        assert_eq!(event.action(), "routing_decision");
        assert_eq!(event.payload()["requires_ack"], true);
    }

    #[tokio::test]
    async fn test_retrieval_filters_and_pins_version() {
        let config = PolicyConfig::default();
        let collaborators = Collaborators::heuristic(&config);
        let mut case = screened_case("DEBIT_CARD", "UNAUTHORIZED_TRANSACTION");
        case.state = CaseState::RoutingPending;

        RetrievalAgent::new(Arc::new(config))
            .act(2, &mut case, &collaborators)
            .await
            .unwrap();

        assert_eq!(case.state, CaseState::Drafting);
        let doc_ids: Vec<&str> = case.retrieval_docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(doc_ids, vec!["kb_debit_unauth_112"]);
        assert_eq!(case.retrieval_policies.len(), 2);
        assert_eq!(case.policy_version_pin.as_deref(), Some("2025.09"));
        assert_eq!(case.last_event().unwrap().action(), "retrieval_done");
    }

    #[tokio::test]
    async fn test_retrieval_drops_low_scoring_fallback_docs() {
        let config = PolicyConfig::default();
        let collaborators = Collaborators::heuristic(&config);
        let mut case = screened_case("MORTGAGE", "PAYMENT_PROCESSING_DELAY");
        case.state = CaseState::RoutingPending;

        RetrievalAgent::new(Arc::new(config))
            .act(2, &mut case, &collaborators)
            .await
            .unwrap();

        assert!(case.retrieval_docs.is_empty());
        assert_eq!(case.state, CaseState::Drafting);
        assert_eq!(case.last_event().unwrap().payload()["doc_ids"], json!([]));
    }

    #[test]
    fn test_retrieval_not_eligible_once_docs_present() {
        let agent = RetrievalAgent::new(Arc::new(PolicyConfig::default()));
        let mut case = screened_case("DEBIT_CARD", "UNAUTHORIZED_TRANSACTION");
        case.state = CaseState::RoutingPending;
        assert!(agent.eligible(&case));

        case.retrieval_docs.push(crate::case::RetrievedDoc {
            id: "kb".to_string(),
            taxonomy: vec![],
            summary: String::new(),
            score: 1.0,
        });
        assert!(!agent.eligible(&case));
    }
}
