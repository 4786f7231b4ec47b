//! Actors and the workers they coordinate

pub mod investigation;
pub mod rca_worker;

pub use investigation::{InvestigationActor, InvestigationArguments, InvestigationMsg};
pub use rca_worker::InvestigationWorker;
