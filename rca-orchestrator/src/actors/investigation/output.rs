//! Incident report assembly and export.

use chrono::{DateTime, Utc};
use shared_types::{
    ExecutionStats, FinalReport, IncidentContext, IncidentReport, InvestigationLimits,
    IterationRecord, TerminationReason,
};
use std::path::{Path, PathBuf};

use super::state::{AggregateState, ResultMap};

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ReportWriteError {
    #[error("failed to serialize report: {0}")]
    Serialize(String),
    #[error("failed to write report {path}: {message}")]
    Io { path: String, message: String },
}

pub struct ReportInputs<'a> {
    pub incident_id: &'a str,
    pub context: &'a IncidentContext,
    pub state: &'a AggregateState,
    pub final_report: FinalReport,
    pub termination: TerminationReason,
    pub iterations: Vec<IterationRecord>,
    pub supervisor_rounds: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub limits: InvestigationLimits,
}

pub fn build_stats(
    results: &ResultMap,
    iterations: u32,
    supervisor_rounds: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    elapsed_seconds: f64,
) -> ExecutionStats {
    let tool_calls_per_task = results
        .iter()
        .map(|(priority, result)| (*priority, result.tool_call_counts.clone()))
        .collect();
    ExecutionStats {
        tool_calls_per_task,
        total_tool_calls: results.values().map(|r| r.total_tool_calls()).sum(),
        iterations,
        supervisor_rounds,
        started_at: Some(started_at),
        completed_at: Some(completed_at),
        execution_time_seconds: elapsed_seconds,
    }
}

pub fn build_incident_report(inputs: ReportInputs<'_>) -> IncidentReport {
    let dispatch_rounds = inputs
        .iterations
        .iter()
        .filter(|record| !record.dispatched.is_empty())
        .count() as u32;
    let stats = build_stats(
        &inputs.state.results,
        dispatch_rounds,
        inputs.supervisor_rounds,
        inputs.started_at,
        inputs.completed_at,
        inputs.elapsed_seconds,
    );

    IncidentReport {
        incident_id: inputs.incident_id.to_string(),
        context: inputs.context.clone(),
        symptoms: inputs.state.symptoms.clone(),
        tasks: inputs.state.task_list(),
        results: inputs.state.result_list(),
        final_report: inputs.final_report,
        termination: inputs.termination,
        iterations: inputs.iterations,
        stats,
        limits: inputs.limits,
    }
}

/// `<app>-<UTC timestamp>-<incident id>.json`, with anything outside
/// `[A-Za-z0-9_-]` in the app name replaced.
pub fn report_file_name(app_name: &str, at: DateTime<Utc>, incident_id: &str) -> String {
    let app: String = app_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let app = if app.is_empty() { "incident".to_string() } else { app };
    format!("{}-{}-{}.json", app, at.format("%Y%m%dT%H%M%SZ"), incident_id)
}

pub fn write_report(dir: &Path, report: &IncidentReport) -> Result<PathBuf, ReportWriteError> {
    let at = report.stats.completed_at.unwrap_or_else(Utc::now);
    let path = dir.join(report_file_name(
        &report.context.app_name,
        at,
        &report.incident_id,
    ));
    let io_error = |e: std::io::Error| ReportWriteError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    std::fs::create_dir_all(dir).map_err(io_error)?;
    let body = serde_json::to_string_pretty(report)
        .map_err(|e| ReportWriteError::Serialize(e.to_string()))?;
    std::fs::write(&path, body).map_err(io_error)?;
    Ok(path)
}
