//! casework - complaint case state machine and handler orchestrator
//!
//! A [`Case`] moves through normalization, classification, risk screening,
//! routing, retrieval, drafting, QA review, a hallucination safety check,
//! dispatch and feedback. Each stage is a [`Handler`]; the [`Orchestrator`]
//! runs every eligible handler per pass, enforces the state graph and keeps
//! an append-only audit trail on the case.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use casework::{Case, Collaborators, Orchestrator, PolicyConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(PolicyConfig::default());
//! let collaborators = Collaborators::heuristic(&config);
//! let orchestrator = Orchestrator::with_default_handlers(config);
//!
//! let mut case = Case::new(
//!     "C_0001",
//!     "I see an unauthorized charge on my debit card",
//!     "email",
//! );
//! let outcome = orchestrator.process(&mut case, &collaborators).await?;
//!
//! println!("{:?} after {} passes", case.state, outcome.steps);
//! for event in case.events() {
//!     println!("{} {} -> {}", event.handler(), event.action(), event.state_entered());
//! }
//! # Ok(())
//! # }
//! ```

pub mod case;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod orchestrator;
pub mod report;
pub mod synthetic;
pub mod testing;

pub use case::{Case, CaseState, Draft, Event, Severity};
pub use collaborators::{CollaboratorError, Collaborators};
pub use config::{ConfigError, PolicyConfig};
pub use error::{CaseError, CaseResult};
pub use handlers::{default_handlers, Handler};
pub use orchestrator::{CaseRun, Orchestrator, OrchestratorError, ProcessOutcome, Termination};
pub use report::{CaseReport, RunSummary};
