//! Task scheduler
//!
//! Pure function of the current task map and the supervisor's request:
//! - no request: the first `max_parallel_tasks` pending tasks by ascending priority
//! - a request: exactly the requested tasks that exist and are not completed
//!
//! Selected tasks move to `in_progress`. Any other `in_progress` task rolls
//! back to `pending`. `completed` is never touched.

use shared_types::{InvestigationTask, TaskStatus};
use std::collections::BTreeSet;

use super::state::TaskMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerLimits {
    /// Iteration width when the supervisor made no explicit request
    pub max_parallel_tasks: usize,
    /// Cumulative number of tasks that may ever be dispatched for one incident
    pub max_task_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    pub tasks: TaskMap,
    /// Tasks to dispatch this iteration, ascending priority
    pub dispatch: Vec<InvestigationTask>,
    /// Requested or eligible priorities that were not selected
    pub skipped: Vec<u32>,
    /// Nothing selected and nothing pending anywhere
    pub no_work: bool,
}

impl ScheduleOutcome {
    pub fn dispatched_priorities(&self) -> Vec<u32> {
        self.dispatch.iter().map(|task| task.priority).collect()
    }
}

pub fn schedule(
    tasks: &TaskMap,
    requested: &BTreeSet<u32>,
    limits: SchedulerLimits,
) -> ScheduleOutcome {
    let mut skipped = Vec::new();

    let mut selected: Vec<u32> = if requested.is_empty() {
        tasks
            .values()
            .filter(|task| task.status == TaskStatus::Pending)
            .take(limits.max_parallel_tasks)
            .map(|task| task.priority)
            .collect()
    } else {
        requested
            .iter()
            .copied()
            .filter(|priority| match tasks.get(priority) {
                None => {
                    tracing::warn!(priority, "Skipping requested task that does not exist");
                    skipped.push(*priority);
                    false
                }
                Some(task) if task.status.is_completed() => {
                    tracing::warn!(priority, "Skipping requested task that is already completed");
                    skipped.push(*priority);
                    false
                }
                Some(_) => true,
            })
            .collect()
    };

    let already_dispatched = tasks
        .values()
        .filter(|task| task.status.is_completed())
        .count();
    let remaining = limits.max_task_count.saturating_sub(already_dispatched);
    if selected.len() > remaining {
        let dropped = selected.split_off(remaining);
        tracing::warn!(
            max_task_count = limits.max_task_count,
            dropped = ?dropped,
            "Task count cap reached; not dispatching remaining tasks"
        );
        skipped.extend(dropped);
    }

    let selected_set: BTreeSet<u32> = selected.iter().copied().collect();
    let next: TaskMap = tasks
        .iter()
        .map(|(priority, task)| {
            let status = match task.status {
                TaskStatus::Completed => TaskStatus::Completed,
                _ if selected_set.contains(priority) => TaskStatus::InProgress,
                TaskStatus::InProgress => TaskStatus::Pending,
                TaskStatus::Pending => TaskStatus::Pending,
            };
            (*priority, task.with_status(status))
        })
        .collect();

    let dispatch: Vec<InvestigationTask> = selected
        .iter()
        .filter_map(|priority| next.get(priority).cloned())
        .collect();
    let no_work = dispatch.is_empty()
        && !next
            .values()
            .any(|task| task.status == TaskStatus::Pending);

    ScheduleOutcome {
        tasks: next,
        dispatch,
        skipped,
        no_work,
    }
}
