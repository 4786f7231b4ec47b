//! Markdown rendering for oracle contexts.

use shared_types::{IncidentContext, InvestigationTask, Symptom, WorkerResult};

use crate::tools::SUBMIT_DIAGNOSIS_TOOL;

pub const NO_INSIGHTS: &str = "No insights yet";
pub const NO_PREVIOUS_STEPS: &str = "No previous steps yet";

/// Where a worker stands relative to its tool-call budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetZone {
    Normal,
    /// Within two calls of the limit
    Warning,
    /// At or above the limit; the worker must submit
    Exceeded,
}

impl BudgetZone {
    pub fn classify(tool_calls_count: u32, budget: u32) -> Self {
        if tool_calls_count >= budget {
            Self::Exceeded
        } else if tool_calls_count >= budget.saturating_sub(2) {
            Self::Warning
        } else {
            Self::Normal
        }
    }
}

pub fn budget_status(zone: BudgetZone, tool_calls_count: u32, budget: u32) -> String {
    match zone {
        BudgetZone::Normal => String::new(),
        BudgetZone::Warning => format!(
            "BUDGET WARNING: You have made {tool_calls_count}/{budget} tool calls. \
             You should prepare to submit your diagnosis soon."
        ),
        BudgetZone::Exceeded => format!(
            "BUDGET EXCEEDED: You have made {tool_calls_count}/{budget} tool calls.\n\
             You MUST now call {SUBMIT_DIAGNOSIS_TOOL} with your best conclusion based on the \
             evidence gathered so far.\nDo NOT make any more tool calls. Submit your diagnosis \
             immediately."
        ),
    }
}

pub fn render_bullets(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        return empty.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_insights(insights: &[String]) -> String {
    render_bullets(insights, NO_INSIGHTS)
}

pub fn render_steps(steps: &[String]) -> String {
    render_bullets(steps, NO_PREVIOUS_STEPS)
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((end, _)) => trimmed[..end].to_string(),
        None => trimmed.to_string(),
    }
}

pub fn render_incident_header(incident: &IncidentContext) -> String {
    format!(
        "# Incident Analysis Summary\n\n- **Application**: {}\n- **Namespace**: {}\n- **Summary**: {}\n",
        incident.app_name, incident.target_namespace, incident.app_summary
    )
}

pub fn render_symptoms(symptoms: &[Symptom]) -> String {
    if symptoms.is_empty() {
        return String::new();
    }
    let mut out = String::from("# Symptoms Identified\n\n");
    for (i, symptom) in symptoms.iter().enumerate() {
        out.push_str(&format!(
            "## Symptom {}\n\n**Type**: {}\n\n**Resource**: `{}` ({})\n\n**Evidence**: {}\n\n",
            i + 1,
            symptom.kind,
            symptom.resource_name,
            symptom.resource_kind.as_str(),
            symptom.evidence
        ));
    }
    out
}

/// Findings in ascending priority order. Lower priority numbers were judged
/// more important at planning time and carry more weight.
pub fn render_findings(tasks: &[InvestigationTask], results: &[WorkerResult]) -> String {
    if results.is_empty() {
        return String::new();
    }
    let mut out = String::from(
        "# RCA Investigation Findings\n\nLower priority numbers indicate more important investigations.\n\n",
    );
    for result in results {
        let target = tasks
            .iter()
            .find(|task| task.priority == result.task_priority)
            .map(|task| format!("{} ({})", task.target_resource, task.resource_kind.as_str()))
            .unwrap_or_else(|| "unknown target".to_string());
        out.push_str(&format!(
            "## Investigation priority {} - {}\n\n**Outcome**: {:?}\n\n**Diagnosis**: {}\n\n**Reasoning**: {}\n\n",
            result.task_priority, target, result.outcome, result.diagnosis, result.reasoning
        ));
        if !result.insights.is_empty() {
            out.push_str(&format!("**Insights**:\n{}\n\n", render_insights(&result.insights)));
        }
    }
    out
}

/// Pending tasks the supervisor may still request, one line each.
pub fn render_open_tasks(tasks: &[InvestigationTask]) -> String {
    let open: Vec<String> = tasks
        .iter()
        .filter(|task| !task.status.is_completed())
        .map(|task| {
            format!(
                "priority {}: {} on `{}`",
                task.priority, task.goal, task.target_resource
            )
        })
        .collect();
    render_bullets(&open, "No open tasks")
}
