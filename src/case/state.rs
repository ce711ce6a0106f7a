//! Case lifecycle states and the legal transition graph
//!
//! ```text
//! RECEIVED → NORMALIZED → CLASSIFIED → RISK_SCREENED → ROUTING_PENDING → DRAFTING → QA_REVIEW
//!                 │            │              │                                          │
//!                 ▼            ▼              └──────────────► READY_TO_SEND ◄───────────┘
//!             ESCALATED ◄──────┘                                     │
//!                 │                                                 SENT
//!                 └─────────────────────► CLOSED ◄────────────────────┘
//! ```
//!
//! `ERROR` is absorbing and reachable from every non-terminal state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseState {
    Received,
    Normalized,
    Classified,
    RiskScreened,
    RoutingPending,
    Drafting,
    QaReview,
    ReadyToSend,
    Sent,
    Escalated,
    Closed,
    Error,
}

impl CaseState {
    /// All states in declaration order
    pub const ALL: [CaseState; 12] = [
        CaseState::Received,
        CaseState::Normalized,
        CaseState::Classified,
        CaseState::RiskScreened,
        CaseState::RoutingPending,
        CaseState::Drafting,
        CaseState::QaReview,
        CaseState::ReadyToSend,
        CaseState::Sent,
        CaseState::Escalated,
        CaseState::Closed,
        CaseState::Error,
    ];

    /// Canonical upper-case name, as recorded in the event log
    pub fn as_str(self) -> &'static str {
        match self {
            CaseState::Received => "RECEIVED",
            CaseState::Normalized => "NORMALIZED",
            CaseState::Classified => "CLASSIFIED",
            CaseState::RiskScreened => "RISK_SCREENED",
            CaseState::RoutingPending => "ROUTING_PENDING",
            CaseState::Drafting => "DRAFTING",
            CaseState::QaReview => "QA_REVIEW",
            CaseState::ReadyToSend => "READY_TO_SEND",
            CaseState::Sent => "SENT",
            CaseState::Escalated => "ESCALATED",
            CaseState::Closed => "CLOSED",
            CaseState::Error => "ERROR",
        }
    }

    /// Parse a canonical state name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|state| state.as_str() == name)
    }

    /// Terminal states end orchestration immediately
    pub fn is_terminal(self) -> bool {
        matches!(self, CaseState::Closed | CaseState::Error)
    }

    /// States the feedback stage closes out
    pub fn is_outcome(self) -> bool {
        matches!(self, CaseState::Sent | CaseState::Escalated)
    }

    /// Whether moving from `self` to `next` respects the lifecycle graph.
    ///
    /// Staying in the same state is always allowed; the QA revision loop and
    /// the hallucination check both do so.
    pub fn can_transition_to(self, next: CaseState) -> bool {
        use CaseState::*;

        if self == next {
            return true;
        }

        if next == Error && !self.is_terminal() {
            return true;
        }

        matches!(
            (self, next),
            (Received, Normalized)
                | (Normalized, Classified)
                | (Normalized, Escalated)
                | (Classified, RiskScreened)
                | (Classified, Escalated)
                | (RiskScreened, RoutingPending)
                | (RiskScreened, ReadyToSend)
                | (RoutingPending, Drafting)
                | (Drafting, QaReview)
                | (QaReview, ReadyToSend)
                | (ReadyToSend, Sent)
                | (Sent, Closed)
                | (Escalated, Closed)
        )
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
