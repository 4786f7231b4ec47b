//! Triage and planning phases
//!
//! Both run once per incident, before the first iteration. Failures degrade
//! to empty lists so the loop can still hand the supervisor what it has.

use shared_types::{InvestigationRequest, InvestigationTask, Symptom, TaskStatus};
use std::collections::BTreeMap;

use super::state::TaskMap;
use crate::oracle::{
    call_validated, CallPolicy, CallSite, PlannedTask, PlanningContext, SharedReasoningOracle,
    TriageContext,
};

/// Symptoms from the request when present, otherwise extracted by the oracle.
pub async fn triage(
    oracle: &SharedReasoningOracle,
    policy: CallPolicy,
    request: &InvestigationRequest,
) -> (Vec<Symptom>, bool) {
    if let Some(symptoms) = &request.symptoms {
        return (symptoms.clone(), true);
    }

    let ctx = TriageContext {
        incident: request.context.clone(),
        triage: request.triage.clone(),
    };
    let ctx = &ctx;
    match call_validated(CallSite::Triage, policy, move || oracle.extract_symptoms(ctx)).await {
        Ok(list) => (list.symptoms, false),
        Err(err) => {
            tracing::warn!(error = %err, "Symptom extraction failed; continuing without symptoms");
            (Vec::new(), false)
        }
    }
}

pub async fn plan(
    oracle: &SharedReasoningOracle,
    policy: CallPolicy,
    request: &InvestigationRequest,
    symptoms: &[Symptom],
) -> TaskMap {
    if symptoms.is_empty() {
        tracing::info!("No symptoms to plan from");
        return TaskMap::new();
    }

    let ctx = PlanningContext {
        incident: request.context.clone(),
        symptoms: symptoms.to_vec(),
        dependencies: relevant_dependencies(&request.dependencies, symptoms),
    };
    let ctx = &ctx;
    match call_validated(CallSite::Planning, policy, move || oracle.plan_tasks(ctx)).await {
        Ok(plan) => build_task_map(plan.tasks),
        Err(err) => {
            tracing::warn!(error = %err, "Planning failed; continuing without tasks");
            TaskMap::new()
        }
    }
}

/// Dependency hints for the resources symptoms name. Falls back to every hint
/// when none of them match by name.
fn relevant_dependencies(
    dependencies: &BTreeMap<String, serde_json::Value>,
    symptoms: &[Symptom],
) -> BTreeMap<String, serde_json::Value> {
    let relevant: BTreeMap<String, serde_json::Value> = dependencies
        .iter()
        .filter(|(name, _)| symptoms.iter().any(|s| &s.resource_name == *name))
        .map(|(name, deps)| (name.clone(), deps.clone()))
        .collect();
    if relevant.is_empty() {
        dependencies.clone()
    } else {
        relevant
    }
}

/// Turn a plan into the task map. Duplicate priorities keep the first task;
/// non-positive priorities are dropped. Both are planner defects and are
/// logged at error level.
pub fn build_task_map(plan: Vec<PlannedTask>) -> TaskMap {
    let mut tasks = TaskMap::new();
    for planned in plan {
        let priority = match u32::try_from(planned.priority) {
            Ok(priority) if priority > 0 => priority,
            _ => {
                tracing::error!(
                    priority = planned.priority,
                    target = %planned.target_resource,
                    "Planner emitted an out-of-range priority; dropping task"
                );
                continue;
            }
        };
        if tasks.contains_key(&priority) {
            tracing::error!(
                priority,
                target = %planned.target_resource,
                "Planner emitted a duplicate priority; keeping the first task"
            );
            continue;
        }
        tasks.insert(
            priority,
            InvestigationTask {
                priority,
                status: TaskStatus::Pending,
                goal: planned.goal,
                target_resource: planned.target_resource,
                resource_kind: planned.resource_kind,
                tool_hints: planned.tool_hints,
            },
        );
    }
    tasks
}
