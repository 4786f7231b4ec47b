//! Investigation lifecycle events
//!
//! Every lifecycle event is a structured `tracing` record carrying a dotted
//! `topic` field, so log pipelines can filter on the same topics the report
//! tooling uses.

use shared_types::{
    IncidentContext, TerminationReason, WorkerResult, EVENT_TOPIC_INVESTIGATION_COMPLETED,
    EVENT_TOPIC_INVESTIGATION_PLANNED, EVENT_TOPIC_INVESTIGATION_STARTED,
    EVENT_TOPIC_INVESTIGATION_TRIAGED, EVENT_TOPIC_ITERATION_DISPATCHED,
    EVENT_TOPIC_SUPERVISOR_DECIDED, EVENT_TOPIC_WORKER_COMPLETED,
};

pub fn emit_investigation_started(incident_id: &str, incident: &IncidentContext) {
    tracing::info!(
        topic = EVENT_TOPIC_INVESTIGATION_STARTED,
        incident_id = %incident_id,
        app_name = %incident.app_name,
        namespace = %incident.target_namespace,
        "Investigation started"
    );
}

pub fn emit_triaged(incident_id: &str, symptom_count: usize, from_request: bool) {
    tracing::info!(
        topic = EVENT_TOPIC_INVESTIGATION_TRIAGED,
        incident_id = %incident_id,
        symptom_count,
        from_request,
        "Triage complete"
    );
}

pub fn emit_planned(incident_id: &str, priorities: &[u32]) {
    tracing::info!(
        topic = EVENT_TOPIC_INVESTIGATION_PLANNED,
        incident_id = %incident_id,
        task_count = priorities.len(),
        priorities = ?priorities,
        "Planning complete"
    );
}

pub fn emit_iteration_dispatched(incident_id: &str, iteration: u32, priorities: &[u32]) {
    tracing::info!(
        topic = EVENT_TOPIC_ITERATION_DISPATCHED,
        incident_id = %incident_id,
        iteration,
        priorities = ?priorities,
        "Dispatching workers"
    );
}

pub fn emit_worker_completed(incident_id: &str, result: &WorkerResult) {
    tracing::info!(
        topic = EVENT_TOPIC_WORKER_COMPLETED,
        incident_id = %incident_id,
        priority = result.task_priority,
        outcome = ?result.outcome,
        tool_calls = result.total_tool_calls(),
        "Worker completed"
    );
}

pub fn emit_supervisor_decided(incident_id: &str, round: u32, verdict: &str) {
    tracing::info!(
        topic = EVENT_TOPIC_SUPERVISOR_DECIDED,
        incident_id = %incident_id,
        round,
        verdict,
        "Supervisor decided"
    );
}

pub fn emit_investigation_completed(
    incident_id: &str,
    termination: TerminationReason,
    iterations: u32,
    elapsed_seconds: f64,
) {
    tracing::info!(
        topic = EVENT_TOPIC_INVESTIGATION_COMPLETED,
        incident_id = %incident_id,
        termination = termination.as_str(),
        iterations,
        elapsed_seconds,
        "Investigation completed"
    );
}
