//! Pipeline handlers
//!
//! A handler is one stage of case processing: an eligibility guard over the
//! case state plus an async action that consults collaborators, mutates the
//! case and records exactly one event. Handlers never decide what runs next;
//! the [`Orchestrator`](crate::orchestrator::Orchestrator) scans them in
//! registration order and runs every eligible one.

use crate::case::Case;
use crate::collaborators::{CollaboratorResult, Collaborators};
use crate::config::PolicyConfig;
use async_trait::async_trait;
use std::sync::Arc;

pub mod closing;
pub mod drafting;
pub mod intake;
pub mod routing;

pub use closing::{DispatchAgent, FeedbackAgent};
pub use drafting::{DraftingAgent, HallucinationAgent, QaAgent};
pub use intake::{ClassificationAgent, NormalizationAgent, RiskScreeningAgent};
pub use routing::{RetrievalAgent, RoutingAgent};

/// One stage of the case pipeline
#[async_trait]
pub trait Handler: Send + Sync {
    /// Name recorded on every event this handler appends
    fn name(&self) -> &'static str;

    /// Pure predicate over the case; must not have side effects
    fn eligible(&self, case: &Case) -> bool;

    /// Perform one unit of work.
    ///
    /// On success exactly one event has been appended and the case is in a
    /// state reachable from the one it entered with. On error the case must
    /// be left without a partial event; the orchestrator records the failure.
    async fn act(
        &self,
        step: u32,
        case: &mut Case,
        collaborators: &Collaborators,
    ) -> CollaboratorResult<()>;
}

/// The ten pipeline handlers in registration order
pub fn default_handlers(config: Arc<PolicyConfig>) -> Vec<Box<dyn Handler>> {
    vec![
        Box::new(NormalizationAgent::new()),
        Box::new(ClassificationAgent::new(config.clone())),
        Box::new(RiskScreeningAgent::new(config.clone())),
        Box::new(RoutingAgent::new()),
        Box::new(RetrievalAgent::new(config.clone())),
        Box::new(DraftingAgent::new()),
        Box::new(QaAgent::new(config.clone())),
        Box::new(HallucinationAgent::new(config)),
        Box::new(DispatchAgent::new()),
        Box::new(FeedbackAgent::new()),
    ]
}
