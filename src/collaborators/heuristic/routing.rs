//! Rule-based queue assignment

use crate::case::Case;
use crate::collaborators::{CollaboratorResult, RouteAssignment, RoutingEngine};
use async_trait::async_trait;

/// First matching rule wins; every queue requires an acknowledgment draft
#[derive(Debug, Default)]
pub struct RuleRoutingEngine;

impl RuleRoutingEngine {
    pub fn new() -> Self {
        Self
    }
}

fn route(queue: &str, reason: &str) -> RouteAssignment {
    RouteAssignment {
        queue: queue.to_string(),
        reason: reason.to_string(),
        requires_ack: true,
    }
}

#[async_trait]
impl RoutingEngine for RuleRoutingEngine {
    async fn assign_route(&self, case: &Case) -> CollaboratorResult<RouteAssignment> {
        if case.risk_flags.iter().any(|f| f == "POTENTIAL_FRAUD") {
            return Ok(route("FraudOps", "risk_flag_fraud"));
        }

        let assignment = match (case.product.as_deref(), case.issue.as_deref()) {
            (Some("DEBIT_CARD"), Some("UNAUTHORIZED_TRANSACTION")) => {
                route("CardDisputes", "taxonomy_match")
            }
            (Some("ONLINE_BANKING"), _) => route("DigitalSupport", "product_online_banking"),
            _ => route("GeneralSupport", "fallback"),
        };
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case_with(product: &str, issue: &str, flags: &[&str]) -> Case {
        let mut case = Case::new("C1", "text", "chat");
        case.product = Some(product.to_string());
        case.issue = Some(issue.to_string());
        case.risk_flags = flags.iter().map(|f| f.to_string()).collect();
        case
    }

    #[tokio::test]
    async fn test_fraud_flag_takes_priority() {
        let case = case_with("DEBIT_CARD", "UNAUTHORIZED_TRANSACTION", &["POTENTIAL_FRAUD"]);
        let route = RuleRoutingEngine::new().assign_route(&case).await.unwrap();

        assert_eq!(route.queue, "FraudOps");
        assert_eq!(route.reason, "risk_flag_fraud");
        assert!(route.requires_ack);
    }

    #[tokio::test]
    async fn test_card_dispute_route() {
        let case = case_with("DEBIT_CARD", "UNAUTHORIZED_TRANSACTION", &[]);
        let route = RuleRoutingEngine::new().assign_route(&case).await.unwrap();
        assert_eq!(route.queue, "CardDisputes");
    }

    #[tokio::test]
    async fn test_online_banking_and_fallback() {
        let engine = RuleRoutingEngine::new();

        let online = case_with("ONLINE_BANKING", "ACCESS_LOCKOUT", &[]);
        assert_eq!(
            engine.assign_route(&online).await.unwrap().queue,
            "DigitalSupport"
        );

        let other = case_with("MORTGAGE", "PAYMENT_PROCESSING_DELAY", &[]);
        let route = engine.assign_route(&other).await.unwrap();
        assert_eq!(route.queue, "GeneralSupport");
        assert_eq!(route.reason, "fallback");
    }
}
