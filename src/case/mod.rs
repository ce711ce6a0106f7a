//! Case model: lifecycle state, the case record and its audit trail

pub mod model;
pub mod state;

pub use model::{Case, Draft, Event, PolicyClause, RetrievedDoc, Severity};
pub use state::CaseState;
