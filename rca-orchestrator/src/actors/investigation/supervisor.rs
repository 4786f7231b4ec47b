//! Supervisor loop
//!
//! The single decision point that either finalizes the investigation or asks
//! for more work. The oracle's answer is never trusted blindly:
//!
//! - a meaningful final report wins, even when tasks were also requested
//! - requested priorities are filtered to tasks that exist and are not completed
//! - an empty request, an unreachable oracle or the iteration cap all end the
//!   investigation with a degraded report flagged `inconclusive`

use shared_types::{FinalReport, IncidentContext, TerminationReason};
use std::collections::BTreeSet;

use super::state::{AggregateState, TaskMap};
use crate::oracle::{
    call_validated, prompts, CallPolicy, CallSite, SharedReasoningOracle, SupervisorContext,
};

/// Outcome of one supervisor round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorVerdict {
    Finalize(FinalReport),
    Continue(BTreeSet<u32>),
    Degrade {
        reason: TerminationReason,
        report: FinalReport,
    },
}

impl SupervisorVerdict {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Finalize(_) => "finalize",
            Self::Continue(_) => "continue",
            Self::Degrade { .. } => "degrade",
        }
    }
}

#[derive(Clone)]
pub struct SupervisorLoop {
    oracle: SharedReasoningOracle,
    policy: CallPolicy,
    max_iterations: u32,
}

impl SupervisorLoop {
    pub fn new(oracle: SharedReasoningOracle, policy: CallPolicy, max_iterations: u32) -> Self {
        Self {
            oracle,
            policy,
            max_iterations,
        }
    }

    /// Review the merged state. `round` is 1-based and counts this review.
    pub async fn review(
        &self,
        incident: &IncidentContext,
        state: &AggregateState,
        round: u32,
    ) -> SupervisorVerdict {
        if state.symptoms.is_empty() && state.results.is_empty() {
            tracing::info!(round, "Nothing to review; finishing without consulting the oracle");
            return SupervisorVerdict::Degrade {
                reason: TerminationReason::NoData,
                report: no_data_report(),
            };
        }

        let tasks = state.task_list();
        let results = state.result_list();
        let ctx = SupervisorContext {
            incident: incident.clone(),
            symptoms: state.symptoms.clone(),
            symptoms_summary: format!(
                "{}\n{}",
                prompts::render_incident_header(incident),
                prompts::render_symptoms(&state.symptoms)
            ),
            findings_summary: format!(
                "{}\n# Open Tasks\n\n{}\n",
                prompts::render_findings(&tasks, &results),
                prompts::render_open_tasks(&tasks)
            ),
            tasks,
            results,
            iteration: round,
            max_iterations: self.max_iterations,
        };

        let oracle = &self.oracle;
        let ctx = &ctx;
        let decision =
            match call_validated(CallSite::Supervisor, self.policy, move || oracle.supervise(ctx))
                .await
            {
                Ok(decision) => decision,
                Err(err) => {
                    tracing::error!(round, error = %err, "Supervisor decision unavailable");
                    return degrade(state, TerminationReason::SupervisorUnavailable);
                }
            };

        if let Some(report) = decision.final_report.filter(FinalReport::is_meaningful) {
            if !decision.tasks_to_execute.is_empty() {
                tracing::warn!(
                    round,
                    requested = ?decision.tasks_to_execute,
                    "Supervisor returned both a final report and task requests; finalizing"
                );
            }
            return SupervisorVerdict::Finalize(report);
        }

        let requested = filter_requested(&state.tasks, &decision.tasks_to_execute);
        if requested.is_empty() {
            tracing::warn!(
                round,
                raw_request = ?decision.tasks_to_execute,
                "Supervisor returned neither a final report nor a valid task request"
            );
            return degrade(state, TerminationReason::NoValidRequest);
        }

        if round >= self.max_iterations {
            tracing::warn!(
                round,
                max_iterations = self.max_iterations,
                "Supervisor iteration cap reached; forcing termination"
            );
            return degrade(state, TerminationReason::IterationCap);
        }

        SupervisorVerdict::Continue(requested)
    }
}

/// Keep only priorities that exist and are not completed.
pub fn filter_requested(tasks: &TaskMap, requested: &[u32]) -> BTreeSet<u32> {
    requested
        .iter()
        .copied()
        .filter(|priority| match tasks.get(priority) {
            Some(task) if !task.status.is_completed() => true,
            Some(_) => {
                tracing::warn!(priority, "Supervisor requested a completed task; dropping");
                false
            }
            None => {
                tracing::warn!(priority, "Supervisor requested an unknown task; dropping");
                false
            }
        })
        .collect()
}

fn degrade(state: &AggregateState, reason: TerminationReason) -> SupervisorVerdict {
    SupervisorVerdict::Degrade {
        reason,
        report: degraded_report(state, reason),
    }
}

pub fn no_data_report() -> FinalReport {
    FinalReport {
        root_cause: "No analysis data available".to_string(),
        affected_resources: Vec::new(),
        evidence_summary: "No symptoms or RCA analysis provided".to_string(),
        investigation_summary: "Investigation incomplete - insufficient data".to_string(),
        detected: false,
        localized_resources: Vec::new(),
        inconclusive: true,
    }
}

fn reason_text(reason: TerminationReason) -> &'static str {
    match reason {
        TerminationReason::Finalized => "finalized",
        TerminationReason::NoValidRequest => {
            "supervisor returned neither a final report nor a valid task request"
        }
        TerminationReason::SupervisorUnavailable => "supervisor decision unavailable",
        TerminationReason::IterationCap => "supervisor iteration cap reached",
        TerminationReason::Deadline => "incident deadline elapsed",
        TerminationReason::NoData => "no analysis data available",
    }
}

/// Report built when the loop has to stop without a supervisor diagnosis.
/// Resources come only from results that carry a resolved diagnosis.
pub fn degraded_report(state: &AggregateState, reason: TerminationReason) -> FinalReport {
    let resolved: Vec<_> = state
        .results
        .values()
        .filter(|result| result.has_resolved_diagnosis())
        .collect();

    let resources: Vec<String> = resolved
        .iter()
        .filter_map(|result| state.tasks.get(&result.task_priority))
        .map(|task| task.target_resource.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let evidence_summary = if resolved.is_empty() {
        "No worker produced a resolved diagnosis".to_string()
    } else {
        resolved
            .iter()
            .map(|result| format!("priority {}: {}", result.task_priority, result.diagnosis))
            .collect::<Vec<_>>()
            .join("; ")
    };

    FinalReport {
        root_cause: format!("Investigation inconclusive: {}", reason_text(reason)),
        affected_resources: resources.clone(),
        evidence_summary,
        investigation_summary: format!(
            "{} of {} tasks completed, {} results merged, {} resolved",
            state.completed_count(),
            state.tasks.len(),
            state.results.len(),
            resolved.len()
        ),
        detected: !state.symptoms.is_empty(),
        localized_resources: resources,
        inconclusive: true,
    }
}
