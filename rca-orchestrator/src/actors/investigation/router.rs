//! Orchestration routing
//!
//! Control flow between stages is a typed `NextAction`, chosen by one small
//! function per finished stage. No stage decides where the loop goes next.

use shared_types::{FinalReport, InvestigationTask, TerminationReason};
use std::collections::BTreeSet;

use super::scheduler::ScheduleOutcome;
use super::supervisor::SupervisorVerdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextAction {
    /// Run the scheduler with this request (empty on the first iteration)
    Schedule(BTreeSet<u32>),
    /// Fan out these tasks to workers
    Dispatch(Vec<InvestigationTask>),
    /// Review merged results
    Supervise,
    Terminate {
        reason: TerminationReason,
        report: FinalReport,
    },
}

impl NextAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Schedule(_) => "schedule",
            Self::Dispatch(_) => "dispatch",
            Self::Supervise => "supervise",
            Self::Terminate { .. } => "terminate",
        }
    }
}

/// A stage that just finished
#[derive(Debug)]
pub enum Stage<'a> {
    Planned { task_count: usize },
    Scheduled(&'a ScheduleOutcome),
    Dispatched,
    Reviewed(SupervisorVerdict),
}

pub fn next_action(stage: Stage<'_>) -> NextAction {
    match stage {
        Stage::Planned { task_count: 0 } => NextAction::Supervise,
        Stage::Planned { .. } => NextAction::Schedule(BTreeSet::new()),
        Stage::Scheduled(outcome) if outcome.dispatch.is_empty() => NextAction::Supervise,
        Stage::Scheduled(outcome) => NextAction::Dispatch(outcome.dispatch.clone()),
        Stage::Dispatched => NextAction::Supervise,
        Stage::Reviewed(SupervisorVerdict::Finalize(report)) => NextAction::Terminate {
            reason: TerminationReason::Finalized,
            report,
        },
        Stage::Reviewed(SupervisorVerdict::Continue(requested)) => NextAction::Schedule(requested),
        Stage::Reviewed(SupervisorVerdict::Degrade { reason, report }) => {
            NextAction::Terminate { reason, report }
        }
    }
}
