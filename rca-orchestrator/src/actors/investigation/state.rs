//! Orchestrator working set
//!
//! `AggregateState` is owned by the orchestration loop alone. Every stage
//! returns a new value instead of mutating the previous one, so a rejected
//! transition leaves the last good state untouched.

use shared_types::{FinalReport, InvestigationTask, Symptom, TaskStatus, WorkerResult};
use std::collections::{BTreeMap, BTreeSet};

pub type TaskMap = BTreeMap<u32, InvestigationTask>;
pub type ResultMap = BTreeMap<u32, WorkerResult>;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StateError {
    #[error("task not found: {0}")]
    NotFound(u32),
    #[error("task {priority} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        priority: u32,
        from: TaskStatus,
        to: TaskStatus,
    },
    #[error("task {0} has no merged result")]
    MissingResult(u32),
    #[error("final report already set")]
    AlreadyFinalized,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateState {
    pub symptoms: Vec<Symptom>,
    pub tasks: TaskMap,
    pub results: ResultMap,
    /// Supervisor's ask for the next iteration
    pub requested_priorities: BTreeSet<u32>,
    pub final_report: Option<FinalReport>,
}

impl AggregateState {
    pub fn new(symptoms: Vec<Symptom>, tasks: TaskMap) -> Self {
        Self {
            symptoms,
            tasks,
            ..Self::default()
        }
    }

    pub fn with_tasks(&self, tasks: TaskMap) -> Self {
        Self {
            tasks,
            ..self.clone()
        }
    }

    pub fn with_results(&self, results: ResultMap) -> Self {
        Self {
            results,
            ..self.clone()
        }
    }

    pub fn with_requested(&self, requested_priorities: BTreeSet<u32>) -> Self {
        Self {
            requested_priorities,
            ..self.clone()
        }
    }

    /// Set the final report. It can be set only once.
    pub fn with_final_report(&self, report: FinalReport) -> Result<Self, StateError> {
        if self.final_report.is_some() {
            return Err(StateError::AlreadyFinalized);
        }
        Ok(Self {
            final_report: Some(report),
            requested_priorities: BTreeSet::new(),
            ..self.clone()
        })
    }

    /// Mark dispatched tasks completed. Each must already have a merged result.
    pub fn complete_tasks(&self, priorities: &[u32]) -> Result<Self, StateError> {
        let mut tasks = self.tasks.clone();
        for &priority in priorities {
            let task = tasks.get(&priority).ok_or(StateError::NotFound(priority))?;
            if !self.results.contains_key(&priority) {
                return Err(StateError::MissingResult(priority));
            }
            if !task.status.can_transition_to(TaskStatus::Completed) {
                return Err(StateError::InvalidTransition {
                    priority,
                    from: task.status,
                    to: TaskStatus::Completed,
                });
            }
            let completed = task.with_status(TaskStatus::Completed);
            tasks.insert(priority, completed);
        }
        Ok(self.with_tasks(tasks))
    }

    pub fn completed_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|task| task.status.is_completed())
            .count()
    }

    pub fn task_list(&self) -> Vec<InvestigationTask> {
        self.tasks.values().cloned().collect()
    }

    pub fn result_list(&self) -> Vec<WorkerResult> {
        self.results.values().cloned().collect()
    }

    /// Cross-field invariants that must hold between stages.
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for (priority, task) in &self.tasks {
            if *priority != task.priority {
                violations.push(format!("task keyed {priority} has priority {}", task.priority));
            }
            if task.status.is_completed() && !self.results.contains_key(priority) {
                violations.push(format!("completed task {priority} has no result"));
            }
        }
        for (priority, result) in &self.results {
            if *priority != result.task_priority {
                violations.push(format!(
                    "result keyed {priority} belongs to task {}",
                    result.task_priority
                ));
            }
        }
        for priority in &self.requested_priorities {
            match self.tasks.get(priority) {
                None => violations.push(format!("requested task {priority} does not exist")),
                Some(task) if task.status.is_completed() => {
                    violations.push(format!("requested task {priority} is already completed"))
                }
                Some(_) => {}
            }
        }
        violations
    }
}
