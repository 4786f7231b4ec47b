//! InvestigationActor message protocol
//!
//! Defines the messages the InvestigationActor accepts and the errors that
//! cross the actor/API boundary.

use ractor::RpcReplyPort;
use shared_types::{IncidentReport, IncidentReportSummary, InvestigationRequest};

/// Messages handled by InvestigationActor
#[derive(Debug)]
pub enum InvestigationMsg {
    /// Investigate one incident to completion
    RunInvestigation {
        request: InvestigationRequest,
        reply: RpcReplyPort<Result<IncidentReport, InvestigationError>>,
    },
    /// Fetch a completed report
    GetReport {
        incident_id: String,
        reply: RpcReplyPort<Option<IncidentReport>>,
    },
    /// List completed reports, oldest first
    ListReports {
        reply: RpcReplyPort<Vec<IncidentReportSummary>>,
    },
    /// Internal: a spawned investigation finished
    InvestigationFinished {
        result: Result<IncidentReport, InvestigationError>,
        reply: RpcReplyPort<Result<IncidentReport, InvestigationError>>,
    },
}

/// Errors that propagate out of the orchestrator
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InvestigationError {
    /// Mandatory incident context is missing
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Report not found
    #[error("report not found: {0}")]
    NotFound(String),
    /// Actor could not be reached
    #[error("investigation actor unavailable: {0}")]
    Unavailable(String),
}

impl InvestigationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unavailable(_) => "ACTOR_UNAVAILABLE",
        }
    }
}
