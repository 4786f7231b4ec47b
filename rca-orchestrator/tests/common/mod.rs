#![allow(dead_code)]

use async_trait::async_trait;
use ractor::{Actor, ActorRef};
use rca_orchestrator::actors::investigation::{
    InvestigationActor, InvestigationArguments, InvestigationMsg, Orchestrator,
};
use rca_orchestrator::config::InvestigationConfig;
use rca_orchestrator::oracle::{
    OracleError, PlannedTask, PlanningContext, ReasoningOracle, StepSummary, SummaryContext,
    SupervisorContext, SupervisorDecision, SymptomList, TaskPlan, TriageContext, WorkerContext,
    WorkerDecision,
};
use rca_orchestrator::tools::{ToolError, ToolInvocation, ToolTransport};
use shared_types::{
    FinalReport, IncidentContext, InvestigationRequest, ResourceKind, Symptom,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Oracle that plans one task per symptom, calls `get_logs` once per task,
/// then replays a queue of supervisor decisions before finalizing.
pub struct FixtureOracle {
    plan_size: u32,
    supervisor_queue: Mutex<VecDeque<SupervisorDecision>>,
    pub triage_calls: AtomicU32,
    pub supervisor_calls: AtomicU32,
}

impl FixtureOracle {
    pub fn new(plan_size: u32, supervisor_queue: Vec<SupervisorDecision>) -> Self {
        Self {
            plan_size,
            supervisor_queue: Mutex::new(supervisor_queue.into()),
            triage_calls: AtomicU32::new(0),
            supervisor_calls: AtomicU32::new(0),
        }
    }
}

pub fn symptom(n: u32) -> Symptom {
    Symptom {
        kind: "HighLatency".to_string(),
        resource_kind: ResourceKind::Service,
        resource_name: format!("service-{n}"),
        evidence: format!("p99 latency of service-{n} above 2s"),
    }
}

pub fn final_report(root_cause: &str) -> FinalReport {
    FinalReport {
        root_cause: root_cause.to_string(),
        affected_resources: vec!["service-1".to_string()],
        evidence_summary: "traces stall on the geo service".to_string(),
        investigation_summary: "latency traced to one dependency".to_string(),
        detected: true,
        localized_resources: vec!["service-1".to_string()],
        inconclusive: false,
    }
}

pub fn request_tasks(priorities: &[u32]) -> SupervisorDecision {
    SupervisorDecision {
        final_report: None,
        tasks_to_execute: priorities.to_vec(),
    }
}

#[async_trait]
impl ReasoningOracle for FixtureOracle {
    async fn extract_symptoms(&self, _ctx: &TriageContext) -> Result<SymptomList, OracleError> {
        self.triage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SymptomList {
            symptoms: (1..=self.plan_size).map(symptom).collect(),
        })
    }

    async fn plan_tasks(&self, ctx: &PlanningContext) -> Result<TaskPlan, OracleError> {
        Ok(TaskPlan {
            tasks: ctx
                .symptoms
                .iter()
                .enumerate()
                .map(|(idx, symptom)| PlannedTask {
                    priority: idx as i64 + 1,
                    goal: format!("Find why {} is slow", symptom.resource_name),
                    target_resource: symptom.resource_name.clone(),
                    resource_kind: symptom.resource_kind,
                    tool_hints: vec!["get_traces".to_string()],
                })
                .collect(),
        })
    }

    async fn next_action(&self, ctx: &WorkerContext) -> Result<WorkerDecision, OracleError> {
        if ctx.tool_calls_count == 0 {
            return Ok(WorkerDecision::ToolCalls {
                tool_calls: vec![ToolInvocation {
                    tool_name: "get_logs".to_string(),
                    args: serde_json::Map::new(),
                    reasoning: Some("check for errors".to_string()),
                }],
            });
        }
        Ok(WorkerDecision::Submit {
            diagnosis: format!("{} waits on a saturated dependency", ctx.task.target_resource),
            reasoning: "logs show timeouts".to_string(),
        })
    }

    async fn summarize_step(&self, ctx: &SummaryContext) -> Result<StepSummary, OracleError> {
        Ok(StepSummary {
            insight: format!("{} returned {}", ctx.tool_name, ctx.tool_output),
            prev_step: format!("Read logs of {}", ctx.target_resource),
        })
    }

    async fn supervise(
        &self,
        _ctx: &SupervisorContext,
    ) -> Result<SupervisorDecision, OracleError> {
        self.supervisor_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self
            .supervisor_queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        Ok(queued.unwrap_or_else(|| SupervisorDecision {
            final_report: Some(final_report("geo service connection pool exhausted")),
            tasks_to_execute: Vec::new(),
        }))
    }
}

#[derive(Default)]
pub struct EchoTools;

#[async_trait]
impl ToolTransport for EchoTools {
    async fn invoke(
        &self,
        tool_name: &str,
        _args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        Ok(format!("{tool_name}: 3 timeouts in the last minute"))
    }
}

pub fn test_config() -> InvestigationConfig {
    InvestigationConfig {
        oracle_call_timeout_ms: 1_000,
        tool_call_timeout_ms: 1_000,
        worker_timeout_ms: 5_000,
        incident_deadline_ms: 20_000,
        ..InvestigationConfig::default()
    }
}

pub fn orchestrator(oracle: Arc<FixtureOracle>, config: InvestigationConfig) -> Orchestrator {
    Orchestrator::new(oracle, Arc::new(EchoTools), config)
}

pub fn incident_request(app_name: &str) -> InvestigationRequest {
    InvestigationRequest {
        context: IncidentContext {
            app_name: app_name.to_string(),
            app_summary: format!("{app_name} benchmark application"),
            target_namespace: format!("test-{app_name}"),
            trace_service_starting_point: None,
        },
        ..InvestigationRequest::default()
    }
}

pub async fn spawn_investigation(oracle: Arc<FixtureOracle>) -> ActorRef<InvestigationMsg> {
    let args = InvestigationArguments {
        orchestrator: orchestrator(oracle, test_config()),
    };
    let (actor_ref, _handle) = Actor::spawn(None, InvestigationActor, args).await.unwrap();
    actor_ref
}
