//! Reasoning oracle seam
//!
//! Every judgement call the orchestrator makes (symptom extraction, task
//! planning, worker next action, step summarization, supervisor review) goes
//! through `ReasoningOracle`. Returned structures are validated here; a
//! schema violation is a retryable failure, never a crash.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub mod http;
pub mod prompts;
pub mod types;

pub use http::HttpReasoningOracle;
pub use types::{
    PlannedTask, PlanningContext, StepSummary, SummaryContext, SupervisorContext,
    SupervisorDecision, SymptomList, TaskPlan, TriageContext, Validate, WorkerContext,
    WorkerDecision,
};

pub type SharedReasoningOracle = Arc<dyn ReasoningOracle>;

/// Decision point the oracle is consulted for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite {
    Triage,
    Planning,
    WorkerNextAction,
    WorkerSummary,
    Supervisor,
}

impl CallSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::Planning => "planning",
            Self::WorkerNextAction => "worker_next_action",
            Self::WorkerSummary => "worker_summary",
            Self::Supervisor => "supervisor",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle transport failed: {0}")]
    Transport(String),
    #[error("oracle response violated schema: {0}")]
    Schema(String),
    #[error("oracle call timed out after {0}ms")]
    Timeout(u64),
}

#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    async fn extract_symptoms(&self, ctx: &TriageContext) -> Result<SymptomList, OracleError>;

    async fn plan_tasks(&self, ctx: &PlanningContext) -> Result<TaskPlan, OracleError>;

    async fn next_action(&self, ctx: &WorkerContext) -> Result<WorkerDecision, OracleError>;

    async fn summarize_step(&self, ctx: &SummaryContext) -> Result<StepSummary, OracleError>;

    async fn supervise(&self, ctx: &SupervisorContext)
        -> Result<SupervisorDecision, OracleError>;
}

/// Policy applied to each oracle call: per-attempt timeout plus retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub retries: u32,
    pub timeout: Duration,
}

/// Run `call` until it returns a decision that passes validation, retrying
/// timeouts, transport errors and schema violations up to `policy.retries`
/// extra times. Returns the last error once attempts are exhausted.
pub async fn call_validated<T, F, Fut>(
    call_site: CallSite,
    policy: CallPolicy,
    mut call: F,
) -> Result<T, OracleError>
where
    T: Validate,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OracleError>>,
{
    let attempts = policy.retries + 1;
    let mut last_error = OracleError::Transport("no attempt made".to_string());

    for attempt in 1..=attempts {
        let outcome = match tokio::time::timeout(policy.timeout, call()).await {
            Err(_) => Err(OracleError::Timeout(policy.timeout.as_millis() as u64)),
            Ok(Err(err)) => Err(err),
            Ok(Ok(decision)) => decision
                .validate()
                .map(|()| decision)
                .map_err(OracleError::Schema),
        };

        match outcome {
            Ok(decision) => return Ok(decision),
            Err(err) => {
                tracing::warn!(
                    call_site = call_site.as_str(),
                    attempt,
                    attempts,
                    error = %err,
                    "Oracle call failed"
                );
                last_error = err;
            }
        }
    }

    Err(last_error)
}
