//! HTTP API routes for the RCA orchestrator
//!
//! Thin bridge from HTTP to the InvestigationActor. Every request is one
//! actor call; the handlers hold no state of their own.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use ractor::ActorRef;
use serde_json::json;

pub mod investigation;

use crate::actors::investigation::InvestigationMsg;

#[derive(Clone)]
pub struct ApiState {
    pub investigation: ActorRef<InvestigationMsg>,
}

/// Configure all API routes
pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/investigations",
            get(investigation::list_reports).post(investigation::run_investigation),
        )
        .route(
            "/investigations/{incident_id}",
            get(investigation::get_report),
        )
}

pub async fn health_check(State(_state): State<ApiState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
        "status": "healthy",
        "service": "rca-orchestrator",
        "version": "0.1.0"
        })),
    )
}
