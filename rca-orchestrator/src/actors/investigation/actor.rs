//! InvestigationActor - serialises incident investigations
//!
//! The InvestigationActor is responsible for:
//! - Running one investigation at a time through the `Orchestrator`
//! - Keeping the most recent completed reports for lookup
//!
//! A run executes on a spawned task and folds back through
//! `InvestigationFinished`, so lookups are answered while it is in flight.
//! Requests that arrive during a run wait in a FIFO queue.

use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use shared_types::{IncidentReport, IncidentReportSummary, InvestigationRequest};
use std::collections::{BTreeMap, VecDeque};

use crate::actors::investigation::{
    protocol::{InvestigationError, InvestigationMsg},
    runtime::Orchestrator,
};

type RunReply = RpcReplyPort<Result<IncidentReport, InvestigationError>>;

#[derive(Debug, Default)]
pub struct InvestigationActor;

/// Arguments for spawning InvestigationActor
#[derive(Clone)]
pub struct InvestigationArguments {
    pub orchestrator: Orchestrator,
}

pub struct InvestigationState {
    orchestrator: Orchestrator,
    reports: BTreeMap<String, IncidentReport>,
    /// Incident ids in completion order, oldest first
    completed: VecDeque<String>,
    max_retained_reports: usize,
    running: bool,
    queued: VecDeque<(InvestigationRequest, RunReply)>,
}

#[async_trait]
impl Actor for InvestigationActor {
    type Msg = InvestigationMsg;
    type State = InvestigationState;
    type Arguments = InvestigationArguments;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(actor_id = %myself.get_id(), "InvestigationActor starting");
        let max_retained_reports = args.orchestrator.config().max_retained_reports;
        Ok(InvestigationState {
            orchestrator: args.orchestrator,
            reports: BTreeMap::new(),
            completed: VecDeque::new(),
            max_retained_reports,
            running: false,
            queued: VecDeque::new(),
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            InvestigationMsg::RunInvestigation { request, reply } => {
                if state.running {
                    tracing::info!(
                        app_name = %request.context.app_name,
                        queued = state.queued.len() + 1,
                        "Investigation queued behind running incident"
                    );
                    state.queued.push_back((request, reply));
                } else {
                    self.start_investigation(&myself, state, request, reply);
                }
            }
            InvestigationMsg::InvestigationFinished { result, reply } => {
                self.handle_investigation_finished(state, &result);
                let _ = reply.send(result);
                if let Some((request, reply)) = state.queued.pop_front() {
                    self.start_investigation(&myself, state, request, reply);
                }
            }
            InvestigationMsg::GetReport { incident_id, reply } => {
                let _ = reply.send(state.reports.get(&incident_id).cloned());
            }
            InvestigationMsg::ListReports { reply } => {
                let summaries = state
                    .completed
                    .iter()
                    .filter_map(|id| state.reports.get(id))
                    .map(IncidentReportSummary::from)
                    .collect();
                let _ = reply.send(summaries);
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        myself: ActorRef<Self::Msg>,
        _state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        tracing::info!(actor_id = %myself.get_id(), "InvestigationActor stopped");
        Ok(())
    }
}

impl InvestigationActor {
    fn start_investigation(
        &self,
        myself: &ActorRef<InvestigationMsg>,
        state: &mut InvestigationState,
        request: InvestigationRequest,
        reply: RunReply,
    ) {
        tracing::info!(
            app_name = %request.context.app_name,
            namespace = %request.context.target_namespace,
            "Running investigation"
        );
        state.running = true;

        let orchestrator = state.orchestrator.clone();
        let myself_clone = myself.clone();
        tokio::spawn(async move {
            let result = orchestrator.investigate(request).await;
            if let Err(err) =
                myself_clone.send_message(InvestigationMsg::InvestigationFinished { result, reply })
            {
                tracing::error!(error = %err, "InvestigationActor gone before run finished");
            }
        });
    }

    fn handle_investigation_finished(
        &self,
        state: &mut InvestigationState,
        result: &Result<IncidentReport, InvestigationError>,
    ) {
        state.running = false;
        if let Ok(report) = result {
            state
                .reports
                .insert(report.incident_id.clone(), report.clone());
            state.completed.push_back(report.incident_id.clone());
            while state.completed.len() > state.max_retained_reports {
                let Some(evicted) = state.completed.pop_front() else {
                    break;
                };
                state.reports.remove(&evicted);
                tracing::debug!(incident_id = %evicted, "Evicted oldest report from memory");
            }
        }
    }
}
