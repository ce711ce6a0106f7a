//! Deterministic rule-based collaborators
//!
//! These stand in for model endpoints and external stores. They are pure
//! functions of their input, which keeps whole-pipeline runs reproducible.

pub mod delivery;
pub mod drafting;
pub mod knowledge;
pub mod review;
pub mod routing;
pub mod text;

pub use delivery::{FeedbackRecord, InMemoryFeedbackCollector, LoggingDispatcher};
pub use drafting::{TemplateDraftingModel, ACK_DISCLAIMER};
pub use knowledge::{InMemoryKnowledgeBase, InMemoryPolicyStore};
pub use review::{HeuristicHallucinationScorer, RuleQaGuardrail};
pub use routing::RuleRoutingEngine;
pub use text::{KeywordClassifier, KeywordRiskDetector, RegexPiiScrubber};
