//! Shared investigation data model
//!
//! These types are used by:
//! - the investigation orchestrator (scheduler, workers, supervisor)
//! - the HTTP API and the exported incident report
//!
//! Serializable with serde for JSON over HTTP and for report files.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Symptoms
// ============================================================================

/// Kind of cluster resource a symptom or task refers to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pod,
    Service,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Service => "service",
        }
    }
}

/// A symptom observed in the cluster, produced once by triage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symptom {
    /// Type of symptom observed (e.g. "CrashLoopBackOff", "high p99 latency")
    pub kind: String,
    pub resource_kind: ResourceKind,
    /// Exact resource name, no namespace or decorators
    pub resource_name: String,
    pub evidence: String,
}

// ============================================================================
// Investigation Tasks
// ============================================================================

/// Lifecycle of an investigation task
///
/// ```text
/// Pending → InProgress → Completed
///    ^          |
///    └──────────┘  (rollback when not re-selected)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Whether moving from `self` to `next` respects status monotonicity.
    /// Nothing ever leaves `Completed`.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match (self, next) {
            (Self::Completed, Self::Completed) => true,
            (Self::Completed, _) => false,
            (Self::Pending, Self::Completed) => false,
            _ => true,
        }
    }

    pub fn is_completed(self) -> bool {
        self == Self::Completed
    }
}

/// One bounded unit of root-cause investigation targeting one resource.
///
/// `priority` is the identity key for scheduling, merging and deduplication
/// (1 is the most important).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvestigationTask {
    pub priority: u32,
    pub status: TaskStatus,
    pub goal: String,
    pub target_resource: String,
    pub resource_kind: ResourceKind,
    /// Priority-ordered tool suggestions from planning
    #[serde(default)]
    pub tool_hints: Vec<String>,
}

impl InvestigationTask {
    pub fn with_status(&self, status: TaskStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

// ============================================================================
// Worker Results
// ============================================================================

/// How a worker run ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerOutcome {
    /// The oracle submitted a diagnosis
    Diagnosed,
    /// Budget exhausted without a submission
    Inconclusive,
    /// Oracle or transport failure after retries
    Failed,
    /// Cancelled by the incident deadline
    Cancelled,
    /// Per-worker wall-clock timeout
    TimedOut,
}

/// Result of exactly one worker run, keyed by `task_priority`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerResult {
    pub task_priority: u32,
    pub outcome: WorkerOutcome,
    pub diagnosis: String,
    pub reasoning: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    /// Invocations per tool name, including the terminal submission
    #[serde(default)]
    pub tool_call_counts: BTreeMap<String, u32>,
}

impl WorkerResult {
    /// A result whose diagnosis can be trusted over a placeholder.
    pub fn has_resolved_diagnosis(&self) -> bool {
        self.outcome == WorkerOutcome::Diagnosed && !self.diagnosis.trim().is_empty()
    }

    /// Non-terminal tool invocations (excludes the submission action)
    pub fn investigative_tool_calls(&self, submit_tool: &str) -> u32 {
        self.tool_call_counts
            .iter()
            .filter(|(name, _)| name.as_str() != submit_tool)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn total_tool_calls(&self) -> u32 {
        self.tool_call_counts.values().sum()
    }

    /// Placeholder result for a worker that produced nothing usable
    pub fn placeholder(task_priority: u32, outcome: WorkerOutcome, diagnosis: impl Into<String>) -> Self {
        Self {
            task_priority,
            outcome,
            diagnosis: diagnosis.into(),
            reasoning: String::new(),
            steps: Vec::new(),
            insights: Vec::new(),
            tool_call_counts: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Final Report
// ============================================================================

/// The supervisor's terminal diagnosis for the incident
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalReport {
    pub root_cause: String,
    #[serde(default)]
    pub affected_resources: Vec<String>,
    pub evidence_summary: String,
    pub investigation_summary: String,
    #[serde(default)]
    pub detected: bool,
    #[serde(default)]
    pub localized_resources: Vec<String>,
    /// Set on reports built by forced/degraded termination
    #[serde(default)]
    pub inconclusive: bool,
}

impl FinalReport {
    pub fn is_meaningful(&self) -> bool {
        !self.root_cause.trim().is_empty()
    }
}

// ============================================================================
// Incident Context
// ============================================================================

/// Application context for the incident under investigation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct IncidentContext {
    pub app_name: String,
    #[serde(default)]
    pub app_summary: String,
    pub target_namespace: String,
    /// Service used as the starting point when querying traces
    #[serde(default)]
    pub trace_service_starting_point: Option<String>,
}

/// Raw triage data gathered by the telemetry connectors
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TriageSnapshot {
    #[serde(default)]
    pub problematic_pods: serde_json::Value,
    #[serde(default)]
    pub slow_traces: serde_json::Value,
    #[serde(default)]
    pub problematic_metrics: serde_json::Value,
}

/// Request to investigate one incident
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct InvestigationRequest {
    pub context: IncidentContext,
    /// Pre-computed symptoms; when absent triage runs against `triage`
    #[serde(default)]
    pub symptoms: Option<Vec<Symptom>>,
    #[serde(default)]
    pub triage: TriageSnapshot,
    /// Service dependency hints keyed by resource name, passed to planning
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,
}

// ============================================================================
// Incident Report (exported artifact)
// ============================================================================

/// Why the orchestration loop stopped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Supervisor returned a final report
    Finalized,
    /// Supervisor returned neither a report nor any valid task request
    NoValidRequest,
    /// Supervisor decision unavailable after retries
    SupervisorUnavailable,
    /// Safety cap on supervisor round-trips
    IterationCap,
    /// Incident-wide deadline elapsed
    Deadline,
    /// Nothing to investigate and nothing to review
    NoData,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finalized => "finalized",
            Self::NoValidRequest => "no_valid_request",
            Self::SupervisorUnavailable => "supervisor_unavailable",
            Self::IterationCap => "iteration_cap",
            Self::Deadline => "deadline",
            Self::NoData => "no_data",
        }
    }
}

/// One scheduler → workers → supervisor round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IterationRecord {
    pub iteration: u32,
    pub requested: Vec<u32>,
    pub dispatched: Vec<u32>,
    pub skipped: Vec<u32>,
    /// "finalize", "continue" or "degrade"
    pub supervisor_verdict: String,
}

/// Execution statistics for evaluation tooling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExecutionStats {
    pub tool_calls_per_task: BTreeMap<u32, BTreeMap<String, u32>>,
    pub total_tool_calls: u32,
    pub iterations: u32,
    pub supervisor_rounds: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub execution_time_seconds: f64,
}

/// JSON-serializable artifact of one investigation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentReport {
    pub incident_id: String,
    pub context: IncidentContext,
    pub symptoms: Vec<Symptom>,
    /// Every task with its final status, ascending priority
    pub tasks: Vec<InvestigationTask>,
    /// Merged results, ascending priority
    pub results: Vec<WorkerResult>,
    pub final_report: FinalReport,
    pub termination: TerminationReason,
    pub iterations: Vec<IterationRecord>,
    pub stats: ExecutionStats,
    /// Run parameters, so reports from different budgets can be compared
    #[serde(default)]
    pub limits: InvestigationLimits,
}

/// Budgets an investigation ran under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InvestigationLimits {
    pub max_tool_calls_per_task: u32,
    pub max_parallel_tasks_per_iteration: usize,
    pub max_supervisor_iterations: u32,
    pub max_task_count: usize,
}

/// Lightweight listing entry for stored reports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IncidentReportSummary {
    pub incident_id: String,
    pub app_name: String,
    pub root_cause: String,
    pub termination: TerminationReason,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&IncidentReport> for IncidentReportSummary {
    fn from(report: &IncidentReport) -> Self {
        Self {
            incident_id: report.incident_id.clone(),
            app_name: report.context.app_name.clone(),
            root_cause: report.final_report.root_cause.clone(),
            termination: report.termination,
            completed_at: report.stats.completed_at,
        }
    }
}

// ============================================================================
// Event Topics
// ============================================================================

pub const EVENT_TOPIC_INVESTIGATION_STARTED: &str = "investigation.started";
pub const EVENT_TOPIC_INVESTIGATION_TRIAGED: &str = "investigation.triaged";
pub const EVENT_TOPIC_INVESTIGATION_PLANNED: &str = "investigation.planned";
pub const EVENT_TOPIC_ITERATION_DISPATCHED: &str = "investigation.iteration.dispatched";
pub const EVENT_TOPIC_WORKER_COMPLETED: &str = "investigation.worker.completed";
pub const EVENT_TOPIC_SUPERVISOR_DECIDED: &str = "investigation.supervisor.decided";
pub const EVENT_TOPIC_INVESTIGATION_COMPLETED: &str = "investigation.completed";
