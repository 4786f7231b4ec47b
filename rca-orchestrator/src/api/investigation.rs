//! Investigation API endpoints
//!
//! Running an investigation blocks until the report is complete.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use shared_types::{IncidentReport, IncidentReportSummary, InvestigationRequest};

use crate::actors::investigation::{InvestigationError, InvestigationMsg};
use crate::api::ApiState;

/// Machine-readable error body
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

fn status_code_for(error: &InvestigationError) -> StatusCode {
    match error {
        InvestigationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        InvestigationError::NotFound(_) => StatusCode::NOT_FOUND,
        InvestigationError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_response(error: InvestigationError) -> axum::response::Response {
    let body = Json(ApiError {
        code: error.code().to_string(),
        message: error.to_string(),
    });
    (status_code_for(&error), body).into_response()
}

fn unavailable(err: impl std::fmt::Display) -> axum::response::Response {
    tracing::error!(error = %err, "InvestigationActor RPC failed");
    error_response(InvestigationError::Unavailable(err.to_string()))
}

/// POST /investigations
pub async fn run_investigation(
    State(state): State<ApiState>,
    Json(request): Json<InvestigationRequest>,
) -> impl IntoResponse {
    let result: Result<Result<IncidentReport, InvestigationError>, _> =
        ractor::call!(state.investigation, |reply| {
            InvestigationMsg::RunInvestigation { request, reply }
        });

    match result {
        Ok(Ok(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(Err(err)) => {
            tracing::warn!(code = err.code(), error = %err, "Investigation rejected");
            error_response(err)
        }
        Err(err) => unavailable(err),
    }
}

/// GET /investigations/{incident_id}
pub async fn get_report(
    State(state): State<ApiState>,
    Path(incident_id): Path<String>,
) -> impl IntoResponse {
    if incident_id.trim().is_empty() {
        return error_response(InvestigationError::InvalidRequest(
            "incident id cannot be empty".to_string(),
        ));
    }

    let result: Result<Option<IncidentReport>, _> =
        ractor::call!(state.investigation, |reply| InvestigationMsg::GetReport {
            incident_id: incident_id.clone(),
            reply,
        });

    match result {
        Ok(Some(report)) => (StatusCode::OK, Json(report)).into_response(),
        Ok(None) => error_response(InvestigationError::NotFound(incident_id)),
        Err(err) => unavailable(err),
    }
}

/// GET /investigations
pub async fn list_reports(State(state): State<ApiState>) -> impl IntoResponse {
    let result: Result<Vec<IncidentReportSummary>, _> =
        ractor::call!(state.investigation, |reply| InvestigationMsg::ListReports {
            reply
        });

    match result {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(err) => unavailable(err),
    }
}
