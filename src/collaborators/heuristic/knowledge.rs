//! In-memory knowledge base and policy clause store

use crate::case::{PolicyClause, RetrievedDoc};
use crate::collaborators::{CollaboratorResult, DocumentRetriever, PolicyStore};
use async_trait::async_trait;

/// Relevance given to unfiltered fallback articles
const FALLBACK_SCORE: f64 = 0.2;

struct Article {
    id: &'static str,
    taxonomy: &'static [&'static str],
    summary: &'static str,
}

const KB_ARTICLES: &[Article] = &[
    Article {
        id: "kb_debit_unauth_112",
        taxonomy: &["DEBIT_CARD", "UNAUTHORIZED_TRANSACTION"],
        summary: "Steps for unauthorized debit transactions & dispute timeline.",
    },
    Article {
        id: "kb_lockout_44",
        taxonomy: &["ONLINE_BANKING", "ACCESS_LOCKOUT"],
        summary: "Guidance on multi-factor resets and identity verification.",
    },
    Article {
        id: "kb_fees_disc_31",
        taxonomy: &["CREDIT_CARD", "FEES_DISCLOSURE"],
        summary: "Regulations on fee disclosure and statement layout.",
    },
];

/// Taxonomy-filtered article lookup ranked by overlap
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBase;

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self
    }

    fn to_doc(article: &Article, score: f64) -> RetrievedDoc {
        RetrievedDoc {
            id: article.id.to_string(),
            taxonomy: article.taxonomy.iter().map(|t| t.to_string()).collect(),
            summary: article.summary.to_string(),
            score,
        }
    }
}

#[async_trait]
impl DocumentRetriever for InMemoryKnowledgeBase {
    async fn fetch_docs(
        &self,
        filters: &[String],
        k: usize,
    ) -> CollaboratorResult<Vec<RetrievedDoc>> {
        let mut candidates: Vec<RetrievedDoc> = KB_ARTICLES
            .iter()
            .filter_map(|article| {
                let hits = filters
                    .iter()
                    .filter(|f| article.taxonomy.contains(&f.as_str()))
                    .count();
                (hits > 0).then(|| Self::to_doc(article, hits as f64 / filters.len() as f64))
            })
            .collect();

        if candidates.is_empty() {
            candidates = KB_ARTICLES
                .iter()
                .map(|article| Self::to_doc(article, FALLBACK_SCORE))
                .collect();
        }

        candidates.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        candidates.truncate(k);
        Ok(candidates)
    }
}

struct ClauseRecord {
    id: &'static str,
    product: Option<&'static str>,
    issue: Option<&'static str>,
    text: &'static str,
    version: &'static str,
}

const POLICY_DB: &[ClauseRecord] = &[
    ClauseRecord {
        id: "policy_refund_v4#clause2",
        product: Some("DEBIT_CARD"),
        issue: Some("UNAUTHORIZED_TRANSACTION"),
        text: "Provisional credit typically within 10 business days.",
        version: "2025.09",
    },
    ClauseRecord {
        id: "policy_disclaimer_general#ack",
        product: None,
        issue: None,
        text: "This acknowledgment does not constitute a final decision.",
        version: "2025.09",
    },
];

/// General clauses plus exact product/issue matches
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore;

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn get_policy_clauses(
        &self,
        product: Option<&str>,
        issue: Option<&str>,
    ) -> CollaboratorResult<Vec<PolicyClause>> {
        Ok(POLICY_DB
            .iter()
            .filter(|rec| {
                let general = rec.product.is_none() && rec.issue.is_none();
                general || (rec.product == product && rec.issue == issue)
            })
            .map(|rec| PolicyClause {
                id: rec.id.to_string(),
                product: rec.product.map(str::to_string),
                issue: rec.issue.map(str::to_string),
                text: rec.text.to_string(),
                version: rec.version.to_string(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_full_taxonomy_match_scores_highest() {
        let docs = InMemoryKnowledgeBase::new()
            .fetch_docs(&filters(&["DEBIT_CARD", "UNAUTHORIZED_TRANSACTION"]), 5)
            .await
            .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "kb_debit_unauth_112");
        assert_eq!(docs[0].score, 1.0);
    }

    #[tokio::test]
    async fn test_partial_matches_are_ranked() {
        let docs = InMemoryKnowledgeBase::new()
            .fetch_docs(&filters(&["DEBIT_CARD", "ACCESS_LOCKOUT"]), 5)
            .await
            .unwrap();

        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["kb_debit_unauth_112", "kb_lockout_44"]);
        assert!(docs.iter().all(|d| d.score == 0.5));
    }

    #[tokio::test]
    async fn test_no_match_falls_back_to_all_articles() {
        let docs = InMemoryKnowledgeBase::new()
            .fetch_docs(&filters(&["MORTGAGE"]), 2)
            .await
            .unwrap();

        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.score == FALLBACK_SCORE));
    }

    #[tokio::test]
    async fn test_policy_clauses_for_dispute() {
        let clauses = InMemoryPolicyStore::new()
            .get_policy_clauses(Some("DEBIT_CARD"), Some("UNAUTHORIZED_TRANSACTION"))
            .await
            .unwrap();

        let ids: Vec<_> = clauses.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["policy_refund_v4#clause2", "policy_disclaimer_general#ack"]
        );
    }

    #[tokio::test]
    async fn test_policy_clauses_general_only() {
        let clauses = InMemoryPolicyStore::new()
            .get_policy_clauses(Some("MORTGAGE"), None)
            .await
            .unwrap();

        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].id, "policy_disclaimer_general#ack");
    }
}
