//! Investigation orchestration - scheduler, merger, supervisor, runtime, actor
//!
//! The `Orchestrator` wires the stages of one incident investigation:
//! - **scheduler** picks the next batch of tasks and rolls back stale ones
//! - **rca_worker** runs each task concurrently under a tool-call budget
//! - **merger** folds results by task priority behind the fan-in barrier
//! - **supervisor** finalizes or requests more tasks, under an iteration cap
//!
//! ## Task lifecycle
//!
//! ```text
//! Pending → InProgress → Completed
//!    ^          |
//!    └──────────┘  not re-selected
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ractor::Actor;
//! use rca_orchestrator::actors::investigation::{
//!     InvestigationActor, InvestigationArguments, Orchestrator,
//! };
//!
//! let orchestrator = Orchestrator::new(oracle, tools, config);
//! let (actor_ref, _handle) =
//!     Actor::spawn(None, InvestigationActor, InvestigationArguments { orchestrator }).await?;
//! ```

pub mod actor;
pub mod events;
pub mod merger;
pub mod output;
pub mod planning;
pub mod protocol;
pub mod router;
pub mod runtime;
pub mod scheduler;
pub mod state;
pub mod supervisor;

#[cfg(test)]
pub(crate) mod tests;

pub use actor::{InvestigationActor, InvestigationArguments, InvestigationState};
pub use protocol::{InvestigationError, InvestigationMsg};
pub use runtime::Orchestrator;
