//! Keyword and regex text analysis: PII scrubbing, taxonomy, risk

use crate::case::Severity;
use crate::collaborators::{
    Classification, CollaboratorResult, PiiScrubber, RiskAssessment, RiskDetector, Scrubbed,
    TaxonomyClassifier,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("email pattern is valid")
});

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[- ]?\d{3}[- ]?\d{4}\b").expect("phone pattern is valid"));

const KNOWN_FIRST_NAMES: &[&str] = &["john", "jane", "robert"];

/// Redacts emails, phone numbers and a small list of first names
#[derive(Debug, Default)]
pub struct RegexPiiScrubber;

impl RegexPiiScrubber {
    pub fn new() -> Self {
        Self
    }

    fn redact_pattern(
        text: String,
        pattern: &Regex,
        prefix: &str,
        redactions: &mut HashMap<String, String>,
    ) -> String {
        let mut seen: Vec<String> = Vec::new();
        for m in pattern.find_iter(&text) {
            let found = m.as_str().to_string();
            if !seen.contains(&found) {
                seen.push(found);
            }
        }

        let mut text = text;
        for (i, original) in seen.into_iter().enumerate() {
            let placeholder = format!("<{prefix}_{}>", i + 1);
            text = text.replace(&original, &placeholder);
            redactions.insert(original, placeholder);
        }
        text
    }
}

#[async_trait]
impl PiiScrubber for RegexPiiScrubber {
    async fn scrub(&self, text: &str) -> CollaboratorResult<Scrubbed> {
        let mut redactions = HashMap::new();
        let text = Self::redact_pattern(text.to_string(), &EMAIL_RE, "EMAIL", &mut redactions);
        let text = Self::redact_pattern(text, &PHONE_RE, "PHONE", &mut redactions);

        let tokens: Vec<String> = text
            .split_whitespace()
            .enumerate()
            .map(|(i, token)| {
                let bare = token
                    .trim_matches(|c| c == ',' || c == '.')
                    .to_lowercase();
                if KNOWN_FIRST_NAMES.contains(&bare.as_str()) {
                    let placeholder = format!("<PERSON_{i}>");
                    redactions.insert(token.to_string(), placeholder.clone());
                    placeholder
                } else {
                    token.to_string()
                }
            })
            .collect();

        Ok(Scrubbed {
            normalized_text: tokens.join(" "),
            redactions,
        })
    }
}

/// Ordered keyword tables; the first matching row wins
const PRODUCT_KEYWORDS: &[(&str, &[&str])] = &[
    ("CREDIT_CARD", &["credit card"]),
    ("MORTGAGE", &["mortgage"]),
    (
        "ONLINE_BANKING",
        &["online banking", "locked out", "password", "login", "2fa"],
    ),
    ("DEBIT_CARD", &["debit", "card", "charge", "transaction"]),
];

const ISSUE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "UNAUTHORIZED_TRANSACTION",
        &["unauthorized", "not mine", "did not make"],
    ),
    ("ACCESS_LOCKOUT", &["locked out", "password", "2fa"]),
    ("FEES_DISCLOSURE", &["fee"]),
    ("PAYMENT_PROCESSING_DELAY", &["delay", "late"]),
];

const BASE_CONFIDENCE: f64 = 0.55;
const MATCH_BONUS: f64 = 0.2;

fn first_match(lower: &str, table: &[(&'static str, &[&str])]) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(label, _)| *label)
}

/// Keyword taxonomy classifier.
///
/// Confidence grows with how much of the taxonomy was recognized, so text
/// with no known product or issue falls below the human-review threshold.
#[derive(Debug)]
pub struct KeywordClassifier {
    min_confidence: f64,
}

impl KeywordClassifier {
    pub fn new(min_confidence: f64) -> Self {
        Self { min_confidence }
    }
}

#[async_trait]
impl TaxonomyClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> CollaboratorResult<Classification> {
        let lower = text.to_lowercase();

        let product = first_match(&lower, PRODUCT_KEYWORDS);
        let issue = first_match(&lower, ISSUE_KEYWORDS);

        let sub_issue = match issue {
            Some("UNAUTHORIZED_TRANSACTION") => Some(
                if lower.contains("stolen") || lower.contains("lost") {
                    "LOST_STOLEN_CARD"
                } else if lower.contains("phish") {
                    "PHISHING_RESULT"
                } else {
                    "CARD_NOT_PRESENT"
                },
            ),
            Some("ACCESS_LOCKOUT") => Some(if lower.contains("2fa") || lower.contains("code") {
                "2FA_ISSUE"
            } else {
                "PASSWORD_RESET_FAILURE"
            }),
            _ => None,
        };

        let severity = if lower.contains("fraud") || lower.contains("stolen") {
            Severity::High
        } else if issue == Some("UNAUTHORIZED_TRANSACTION") {
            Severity::Med
        } else {
            Severity::Low
        };

        let matched = [product.is_some(), issue.is_some()]
            .iter()
            .filter(|m| **m)
            .count() as f64;
        let confidence = ((BASE_CONFIDENCE + MATCH_BONUS * matched) * 100.0).round() / 100.0;

        Ok(Classification {
            product: product.unwrap_or("UNKNOWN").to_string(),
            issue: issue.unwrap_or("GENERAL_INQUIRY").to_string(),
            sub_issue: sub_issue.map(str::to_string),
            severity,
            confidence,
            needs_human: confidence < self.min_confidence,
        })
    }
}

const SELF_HARM_KEYWORDS: &[&str] = &["kill myself", "end my life", "suicide"];
const VIOLENCE_KEYWORDS: &[&str] = &["threat", "violence"];
const FRAUD_KEYWORDS: &[&str] = &["fraud", "scam", "identity theft"];
const VULNERABILITY_KEYWORDS: &[&str] = &["disability", "elderly"];

/// Keyword scan for threats, fraud signals and customer vulnerability
#[derive(Debug, Default)]
pub struct KeywordRiskDetector;

impl KeywordRiskDetector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl RiskDetector for KeywordRiskDetector {
    async fn scan_risk(&self, text: &str) -> CollaboratorResult<RiskAssessment> {
        let lower = text.to_lowercase();
        let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

        let mut flags = Vec::new();
        if contains_any(SELF_HARM_KEYWORDS) {
            flags.push("THREAT_SELF_HARM".to_string());
        }
        if contains_any(VIOLENCE_KEYWORDS) {
            flags.push("THREAT_VIOLENCE".to_string());
        }
        if contains_any(FRAUD_KEYWORDS) {
            flags.push("POTENTIAL_FRAUD".to_string());
        }

        let confidence = if flags.is_empty() { 0.7 } else { 0.9 };

        Ok(RiskAssessment {
            vulnerability_flag: contains_any(VULNERABILITY_KEYWORDS),
            flags,
            confidence,
        })
    }
}
