//! Policy configuration for the case pipeline
//!
//! Every section carries serde defaults, so an empty TOML document is a
//! valid configuration. The loaded value is read-only and shared by `Arc`
//! between the orchestrator, the handlers and the heuristic collaborators.

use crate::case::Severity;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

/// Top-level policy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyConfig {
    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    #[serde(default)]
    pub drafting: DraftingConfig,
    #[serde(default)]
    pub hallucination: HallucinationConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Outbound webhook dispatch (optional; logs only when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatch: Option<DispatchConfig>,
}

/// Acknowledgment SLA hour tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlaConfig {
    pub default_ack_hours: i64,
    pub high_severity_ack_hours: i64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            default_ack_hours: 48,
            high_severity_ack_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Below this classifier confidence the case is escalated to a human
    pub min_confidence: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DraftingConfig {
    /// Confidence floor the QA guardrail enforces
    pub min_confidence: f64,
    /// QA revision rounds before a best-effort draft is accepted
    pub max_revision_rounds: u32,
}

impl Default for DraftingConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.65,
            max_revision_rounds: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HallucinationConfig {
    /// Scores strictly above this replace the draft with the safe fallback
    pub threshold: f64,
}

impl Default for HallucinationConfig {
    fn default() -> Self {
        Self { threshold: 0.25 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub min_doc_confidence: f64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_doc_confidence: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RiskConfig {
    /// Flags that send a case straight to a human
    pub escalate_flags: BTreeSet<String>,
    /// Flags that stop processing with an error
    pub hard_block_flags: BTreeSet<String>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            escalate_flags: ["THREAT_SELF_HARM", "THREAT_VIOLENCE"]
                .into_iter()
                .map(String::from)
                .collect(),
            hard_block_flags: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound on passes per case
    pub max_total_steps: u32,
    pub enable_guardrails: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_total_steps: 40,
            enable_guardrails: true,
        }
    }
}

/// Webhook dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DispatchConfig {
    pub webhook_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,
}

fn default_timeout_ms() -> u64 {
    5000
}

/// Upper bound on webhook retries per delivery
pub const MAX_RETRY_ATTEMPTS: usize = 10;

fn default_retry_attempts() -> usize {
    3
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PolicyConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PolicyConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.orchestrator.max_total_steps == 0 {
            return Err(ConfigError::InvalidConfig(
                "orchestrator.max_total_steps must be at least 1".to_string(),
            ));
        }

        let thresholds = [
            ("classification.min_confidence", self.classification.min_confidence),
            ("drafting.min_confidence", self.drafting.min_confidence),
            ("hallucination.threshold", self.hallucination.threshold),
            ("retrieval.min_doc_confidence", self.retrieval.min_doc_confidence),
        ];
        for (name, value) in thresholds {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidConfig(
                "retrieval.top_k must be at least 1".to_string(),
            ));
        }

        if self.sla.default_ack_hours <= 0 || self.sla.high_severity_ack_hours <= 0 {
            return Err(ConfigError::InvalidConfig(
                "SLA hours must be positive".to_string(),
            ));
        }

        if let Some(flag) = self
            .risk
            .escalate_flags
            .intersection(&self.risk.hard_block_flags)
            .next()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "risk flag {flag} cannot be both escalated and hard-blocked"
            )));
        }

        if let Some(dispatch) = &self.dispatch {
            if dispatch.webhook_url.trim().is_empty() {
                return Err(ConfigError::InvalidConfig(
                    "dispatch.webhook_url must not be empty".to_string(),
                ));
            }
            if dispatch.retry_attempts > MAX_RETRY_ATTEMPTS {
                return Err(ConfigError::InvalidConfig(format!(
                    "dispatch.retry_attempts must be at most {MAX_RETRY_ATTEMPTS}, got {}",
                    dispatch.retry_attempts
                )));
            }
        }

        Ok(())
    }

    /// Acknowledgment deadline for a case received at `received_at`
    pub fn compute_sla_deadline(
        &self,
        received_at: DateTime<Utc>,
        severity: Severity,
    ) -> DateTime<Utc> {
        let hours = if severity.is_elevated() {
            self.sla.high_severity_ack_hours
        } else {
            self.sla.default_ack_hours
        };
        received_at + Duration::hours(hours)
    }
}
