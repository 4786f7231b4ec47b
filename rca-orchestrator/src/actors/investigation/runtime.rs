//! Orchestrator runtime
//!
//! Drives one incident through discrete iterations:
//!
//! ```text
//! triage → plan → Schedule → Dispatch → (barrier) → merge → Supervise
//!                    ^                                          |
//!                    └──────────── Continue(requested) ─────────┤
//!                                                               v
//!                                                           Terminate
//! ```
//!
//! The loop owns `AggregateState` exclusively. Workers run concurrently inside
//! one iteration and only hand back values; iterations never overlap.

use chrono::Utc;
use shared_types::{
    IncidentContext, IncidentReport, InvestigationRequest, InvestigationTask,
    IterationRecord, TerminationReason, WorkerOutcome, WorkerResult,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::events;
use super::merger::merge_results;
use super::output::{self, ReportInputs};
use super::planning;
use super::protocol::InvestigationError;
use super::router::{self, NextAction, Stage};
use super::scheduler::{self, SchedulerLimits};
use super::state::AggregateState;
use super::supervisor::{degraded_report, SupervisorLoop};
use crate::actors::rca_worker::{InvestigationWorker, WorkerSettings};
use crate::config::InvestigationConfig;
use crate::oracle::{CallPolicy, SharedReasoningOracle};
use crate::tools::{SharedToolTransport, ToolRegistry};

#[derive(Clone)]
pub struct Orchestrator {
    oracle: SharedReasoningOracle,
    worker: InvestigationWorker,
    supervisor: SupervisorLoop,
    config: Arc<InvestigationConfig>,
}

/// Results gathered behind one fan-in barrier
struct DispatchOutcome {
    results: Vec<WorkerResult>,
    deadline_hit: bool,
}

impl Orchestrator {
    pub fn new(
        oracle: SharedReasoningOracle,
        tools: SharedToolTransport,
        config: InvestigationConfig,
    ) -> Self {
        let registry = Arc::new(ToolRegistry::new(config.tools.allowed.iter().cloned()));
        let worker = InvestigationWorker::new(
            oracle.clone(),
            tools,
            registry,
            WorkerSettings::from_config(&config),
        );
        let supervisor = SupervisorLoop::new(
            oracle.clone(),
            oracle_policy(&config),
            config.max_supervisor_iterations,
        );
        Self {
            oracle,
            worker,
            supervisor,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &InvestigationConfig {
        &self.config
    }

    fn limits(&self) -> SchedulerLimits {
        SchedulerLimits {
            max_parallel_tasks: self.config.max_parallel_tasks_per_iteration,
            max_task_count: self.config.max_task_count,
        }
    }

    /// Investigate one incident to a completed report. Only a request missing
    /// mandatory context is an error; everything else degrades.
    pub async fn investigate(
        &self,
        request: InvestigationRequest,
    ) -> Result<IncidentReport, InvestigationError> {
        validate_request(&request)?;

        let incident_id = ulid::Ulid::new().to_string();
        let started_at = Utc::now();
        let clock = Instant::now();
        let deadline = clock + self.config.incident_deadline();
        let incident = request.context.clone();
        let policy = oracle_policy(&self.config);

        events::emit_investigation_started(&incident_id, &incident);

        let (symptoms, from_request) = planning::triage(&self.oracle, policy, &request).await;
        events::emit_triaged(&incident_id, symptoms.len(), from_request);

        let tasks = planning::plan(&self.oracle, policy, &request, &symptoms).await;
        events::emit_planned(&incident_id, &tasks.keys().copied().collect::<Vec<_>>());

        let mut state = AggregateState::new(symptoms, tasks);
        let mut iterations: Vec<IterationRecord> = Vec::new();
        let mut open_record: Option<IterationRecord> = None;
        let mut supervisor_rounds = 0u32;
        let mut next = router::next_action(Stage::Planned {
            task_count: state.tasks.len(),
        });

        let (termination, final_report) = loop {
            tracing::debug!(incident_id = %incident_id, next = next.label(), "Routing");
            match next {
                NextAction::Schedule(requested) => {
                    state = state.with_requested(requested);
                    let outcome =
                        scheduler::schedule(&state.tasks, &state.requested_priorities, self.limits());
                    state = state.with_tasks(outcome.tasks.clone());
                    open_record = Some(IterationRecord {
                        iteration: iterations.len() as u32 + 1,
                        requested: state.requested_priorities.iter().copied().collect(),
                        dispatched: outcome.dispatched_priorities(),
                        skipped: outcome.skipped.clone(),
                        supervisor_verdict: String::new(),
                    });
                    if outcome.no_work {
                        tracing::info!(incident_id = %incident_id, "No work left; going to supervisor");
                    }
                    next = router::next_action(Stage::Scheduled(&outcome));
                }
                NextAction::Dispatch(batch) => {
                    let priorities: Vec<u32> = batch.iter().map(|task| task.priority).collect();
                    events::emit_iteration_dispatched(
                        &incident_id,
                        iterations.len() as u32 + 1,
                        &priorities,
                    );

                    let dispatched = self
                        .dispatch(&incident_id, &incident, &batch, deadline)
                        .await;
                    state = fold_batch(&incident_id, &state, &priorities, &dispatched.results);
                    log_violations(&incident_id, &state);

                    if dispatched.deadline_hit {
                        if let Some(mut record) = open_record.take() {
                            record.supervisor_verdict = "deadline".to_string();
                            iterations.push(record);
                        }
                        break (
                            TerminationReason::Deadline,
                            degraded_report(&state, TerminationReason::Deadline),
                        );
                    }
                    next = router::next_action(Stage::Dispatched);
                }
                NextAction::Supervise => {
                    let mut record = open_record.take().unwrap_or_else(|| IterationRecord {
                        iteration: iterations.len() as u32 + 1,
                        requested: Vec::new(),
                        dispatched: Vec::new(),
                        skipped: Vec::new(),
                        supervisor_verdict: String::new(),
                    });

                    if Instant::now() >= deadline {
                        tracing::warn!(incident_id = %incident_id, "Incident deadline elapsed before supervisor review");
                        record.supervisor_verdict = "deadline".to_string();
                        iterations.push(record);
                        break (
                            TerminationReason::Deadline,
                            degraded_report(&state, TerminationReason::Deadline),
                        );
                    }

                    supervisor_rounds += 1;
                    let verdict = self
                        .supervisor
                        .review(&incident, &state, supervisor_rounds)
                        .await;
                    events::emit_supervisor_decided(&incident_id, supervisor_rounds, verdict.label());
                    record.supervisor_verdict = verdict.label().to_string();
                    iterations.push(record);

                    next = router::next_action(Stage::Reviewed(verdict));
                }
                NextAction::Terminate { reason, report } => break (reason, report),
            }
        };

        let state = match state.with_final_report(final_report.clone()) {
            Ok(finalized) => finalized,
            Err(err) => {
                tracing::error!(incident_id = %incident_id, error = %err, "Final report rejected");
                state
            }
        };

        let elapsed_seconds = clock.elapsed().as_secs_f64();
        let report = output::build_incident_report(ReportInputs {
            incident_id: &incident_id,
            context: &incident,
            state: &state,
            final_report,
            termination,
            iterations,
            supervisor_rounds,
            started_at,
            completed_at: Utc::now(),
            elapsed_seconds,
            limits: self.config.limits(),
        });

        if let Some(dir) = &self.config.reports_dir {
            match output::write_report(dir, &report) {
                Ok(path) => {
                    tracing::info!(incident_id = %incident_id, path = %path.display(), "Wrote incident report")
                }
                Err(err) => {
                    tracing::warn!(incident_id = %incident_id, error = %err, "Failed to write incident report")
                }
            }
        }

        events::emit_investigation_completed(
            &incident_id,
            termination,
            report.stats.iterations,
            elapsed_seconds,
        );
        Ok(report)
    }

    /// Fan out `batch` and wait at the barrier for every worker. When the
    /// incident deadline passes, in-flight workers are cancelled and drained.
    async fn dispatch(
        &self,
        incident_id: &str,
        incident: &IncidentContext,
        batch: &[InvestigationTask],
        deadline: Instant,
    ) -> DispatchOutcome {
        let cancel = CancellationToken::new();
        let worker_timeout = self.config.worker_timeout();
        let mut join_set = JoinSet::new();

        for task in batch {
            let worker = self.worker.clone();
            let incident = incident.clone();
            let task = task.clone();
            let token = cancel.child_token();
            join_set.spawn(async move {
                match tokio::time::timeout(worker_timeout, worker.run(&incident, &task, token)).await
                {
                    Ok(result) => result,
                    Err(_) => {
                        tracing::warn!(priority = task.priority, "Worker timed out");
                        WorkerResult::placeholder(
                            task.priority,
                            WorkerOutcome::TimedOut,
                            format!(
                                "Investigation inconclusive: worker timed out after {}ms",
                                worker_timeout.as_millis()
                            ),
                        )
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(batch.len());
        let mut collect = |joined: Result<WorkerResult, tokio::task::JoinError>| match joined {
            Ok(result) => {
                events::emit_worker_completed(incident_id, &result);
                results.push(result);
            }
            Err(err) => {
                tracing::error!(incident_id = %incident_id, error = %err, "Worker task aborted");
            }
        };

        let deadline_hit = loop {
            match tokio::time::timeout_at(deadline, join_set.join_next()).await {
                Ok(Some(joined)) => collect(joined),
                Ok(None) => break false,
                Err(_) => break true,
            }
        };
        if deadline_hit {
            tracing::warn!(incident_id = %incident_id, "Incident deadline elapsed; cancelling workers");
            cancel.cancel();
            while let Some(joined) = join_set.join_next().await {
                collect(joined);
            }
        }

        // exactly one result per dispatched task
        let returned: BTreeSet<u32> = results.iter().map(|r| r.task_priority).collect();
        for task in batch {
            if !returned.contains(&task.priority) {
                results.push(WorkerResult::placeholder(
                    task.priority,
                    WorkerOutcome::Failed,
                    "Investigation failed: worker aborted",
                ));
            }
        }

        DispatchOutcome {
            results,
            deadline_hit,
        }
    }
}

fn oracle_policy(config: &InvestigationConfig) -> CallPolicy {
    CallPolicy {
        retries: config.oracle_retries,
        timeout: config.oracle_call_timeout(),
    }
}

fn validate_request(request: &InvestigationRequest) -> Result<(), InvestigationError> {
    if request.context.app_name.trim().is_empty() {
        return Err(InvestigationError::InvalidRequest(
            "context.app_name is required".to_string(),
        ));
    }
    if request.context.target_namespace.trim().is_empty() {
        return Err(InvestigationError::InvalidRequest(
            "context.target_namespace is required".to_string(),
        ));
    }
    Ok(())
}

/// Merge one batch behind the barrier, complete its tasks and consume the
/// request that selected them.
fn fold_batch(
    incident_id: &str,
    state: &AggregateState,
    priorities: &[u32],
    results: &[WorkerResult],
) -> AggregateState {
    let merged = state.with_results(merge_results(&state.results, results));
    let completed = match merged.complete_tasks(priorities) {
        Ok(completed) => completed,
        Err(err) => {
            tracing::error!(incident_id = %incident_id, error = %err, "Could not complete dispatched tasks");
            merged
        }
    };
    completed.with_requested(BTreeSet::new())
}

fn log_violations(incident_id: &str, state: &AggregateState) {
    for violation in state.invariant_violations() {
        tracing::error!(incident_id = %incident_id, violation = %violation, "State invariant violated");
    }
}
