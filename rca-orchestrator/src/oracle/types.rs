//! Structured contexts sent to the oracle and the typed decisions it returns.

use serde::{Deserialize, Serialize};
use shared_types::{
    FinalReport, IncidentContext, InvestigationTask, ResourceKind, Symptom, TriageSnapshot,
    WorkerResult,
};
use std::collections::BTreeMap;

use crate::tools::ToolInvocation;

/// Schema check applied to every oracle decision before it is trusted.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

// ============================================================================
// Contexts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageContext {
    pub incident: IncidentContext,
    pub triage: TriageSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanningContext {
    pub incident: IncidentContext,
    pub symptoms: Vec<Symptom>,
    /// Dependency hints for the resources named by `symptoms`
    pub dependencies: BTreeMap<String, serde_json::Value>,
}

/// Everything the oracle sees during one REASON turn of a worker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerContext {
    pub incident: IncidentContext,
    pub task: InvestigationTask,
    pub tool_calls_count: u32,
    pub investigation_budget: u32,
    pub budget_status: String,
    pub insights: String,
    pub prev_steps: String,
    pub available_tools: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryContext {
    pub task_goal: String,
    pub target_resource: String,
    pub tool_name: String,
    pub tool_args: serde_json::Map<String, serde_json::Value>,
    /// Hypothesis the worker gave for the call
    #[serde(default)]
    pub tool_reasoning: Option<String>,
    pub tool_output: String,
    pub insights: String,
    pub prev_steps: String,
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupervisorContext {
    pub incident: IncidentContext,
    pub symptoms: Vec<Symptom>,
    pub tasks: Vec<InvestigationTask>,
    pub results: Vec<WorkerResult>,
    pub symptoms_summary: String,
    pub findings_summary: String,
    pub iteration: u32,
    pub max_iterations: u32,
}

// ============================================================================
// Decisions
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SymptomList {
    #[serde(default)]
    pub symptoms: Vec<Symptom>,
}

impl Validate for SymptomList {
    fn validate(&self) -> Result<(), String> {
        match self
            .symptoms
            .iter()
            .position(|s| s.resource_name.trim().is_empty())
        {
            Some(index) => Err(format!("symptom {index} has no resource_name")),
            None => Ok(()),
        }
    }
}

/// Planned task as emitted by the oracle, before deduplication.
///
/// `priority` is signed so that out-of-range values survive decoding and can
/// be reported instead of failing the whole plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannedTask {
    pub priority: i64,
    pub goal: String,
    pub target_resource: String,
    pub resource_kind: ResourceKind,
    #[serde(default)]
    pub tool_hints: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskPlan {
    #[serde(default)]
    pub tasks: Vec<PlannedTask>,
}

impl Validate for TaskPlan {
    fn validate(&self) -> Result<(), String> {
        for task in &self.tasks {
            if task.goal.trim().is_empty() {
                return Err(format!("task {} has an empty goal", task.priority));
            }
            if task.target_resource.trim().is_empty() {
                return Err(format!("task {} has no target_resource", task.priority));
            }
        }
        Ok(())
    }
}

/// What a worker does next: call tools or submit its diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkerDecision {
    ToolCalls { tool_calls: Vec<ToolInvocation> },
    Submit { diagnosis: String, reasoning: String },
}

impl Validate for WorkerDecision {
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::ToolCalls { tool_calls } if tool_calls.is_empty() => {
                Err("tool_calls action without any tool call".to_string())
            }
            Self::ToolCalls { tool_calls } => match tool_calls
                .iter()
                .find(|call| call.tool_name.trim().is_empty())
            {
                Some(_) => Err("tool call without a tool_name".to_string()),
                None => Ok(()),
            },
            Self::Submit { diagnosis, .. } if diagnosis.trim().is_empty() => {
                Err("submission without a diagnosis".to_string())
            }
            Self::Submit { .. } => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StepSummary {
    /// Most important new finding, empty when the call taught nothing
    #[serde(default)]
    pub insight: String,
    /// Concise description of the action taken
    pub prev_step: String,
}

impl Validate for StepSummary {
    fn validate(&self) -> Result<(), String> {
        if self.prev_step.trim().is_empty() {
            return Err("summary without prev_step".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SupervisorDecision {
    #[serde(default)]
    pub final_report: Option<FinalReport>,
    #[serde(default)]
    pub tasks_to_execute: Vec<u32>,
}

impl Validate for SupervisorDecision {
    fn validate(&self) -> Result<(), String> {
        if self.tasks_to_execute.contains(&0) {
            return Err("tasks_to_execute contains priority 0".to_string());
        }
        Ok(())
    }
}
