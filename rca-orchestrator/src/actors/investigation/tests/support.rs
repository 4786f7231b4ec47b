use async_trait::async_trait;
use ractor::{Actor, ActorRef};
use shared_types::{
    FinalReport, IncidentContext, InvestigationRequest, ResourceKind, Symptom,
};
use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::actors::investigation::{
    InvestigationActor, InvestigationArguments, InvestigationMsg, Orchestrator,
};
use crate::actors::rca_worker::{InvestigationWorker, WorkerSettings};
use crate::config::InvestigationConfig;
use crate::oracle::{
    CallPolicy, OracleError, PlannedTask, PlanningContext, ReasoningOracle, StepSummary,
    SummaryContext, SupervisorContext, SupervisorDecision, SymptomList, TaskPlan, TriageContext,
    WorkerContext, WorkerDecision,
};
use crate::tools::{ToolError, ToolInvocation, ToolRegistry, ToolTransport};

/// How scripted workers behave at the REASON step
#[derive(Debug, Clone)]
pub(crate) enum WorkerScript {
    /// Call `get_logs` until `n` calls were made, then submit
    CallsThenSubmit(u32),
    /// Propose `per_turn` tool calls forever
    NeverSubmit { per_turn: usize },
    /// Propose only tools outside the registry
    DisallowedTools,
    /// Never answer within any reasonable timeout
    Hang,
    /// Always fail with a transport error
    Fail,
}

/// How the scripted supervisor answers once its queue is drained
#[derive(Debug, Clone)]
pub(crate) enum SupervisorFallback {
    Finalize,
    /// Ask for every non-completed task it can see
    RequestOpenTasks,
    /// Ask for priority 1 again (always already completed)
    RequestCompleted,
    Empty,
    Fail,
}

pub(crate) struct ScriptedOracle {
    pub symptoms: Vec<Symptom>,
    pub plan: Vec<PlannedTask>,
    pub worker: WorkerScript,
    pub supervisor_queue: Mutex<VecDeque<SupervisorDecision>>,
    pub supervisor_fallback: SupervisorFallback,
    pub fail_summaries: bool,
    pub triage_calls: AtomicU32,
    pub supervisor_calls: AtomicU32,
    pub supervisor_contexts: Mutex<Vec<SupervisorContext>>,
    /// `(tool_calls_count, budget_status)` seen at every REASON step
    pub worker_budgets: Mutex<Vec<(u32, String)>>,
}

impl ScriptedOracle {
    pub fn new(plan_size: u32) -> Self {
        Self {
            symptoms: (1..=plan_size).map(symptom).collect(),
            plan: (1..=plan_size).map(|p| planned(p as i64)).collect(),
            worker: WorkerScript::CallsThenSubmit(1),
            supervisor_queue: Mutex::new(VecDeque::new()),
            supervisor_fallback: SupervisorFallback::Finalize,
            fail_summaries: false,
            triage_calls: AtomicU32::new(0),
            supervisor_calls: AtomicU32::new(0),
            supervisor_contexts: Mutex::new(Vec::new()),
            worker_budgets: Mutex::new(Vec::new()),
        }
    }

    pub fn with_worker(mut self, worker: WorkerScript) -> Self {
        self.worker = worker;
        self
    }

    pub fn with_plan(mut self, plan: Vec<PlannedTask>) -> Self {
        self.plan = plan;
        self
    }

    pub fn with_supervisor(
        self,
        queue: Vec<SupervisorDecision>,
        fallback: SupervisorFallback,
    ) -> Self {
        Self {
            supervisor_queue: Mutex::new(queue.into()),
            supervisor_fallback: fallback,
            ..self
        }
    }

    pub fn supervisor_calls(&self) -> u32 {
        self.supervisor_calls.load(Ordering::SeqCst)
    }
}

pub(crate) fn symptom(n: u32) -> Symptom {
    Symptom {
        kind: "CrashLoopBackOff".to_string(),
        resource_kind: ResourceKind::Pod,
        resource_name: format!("pod-{n}"),
        evidence: format!("pod-{n} restarted 12 times"),
    }
}

pub(crate) fn planned(priority: i64) -> PlannedTask {
    PlannedTask {
        priority,
        goal: format!("Investigate restarts of pod-{priority}"),
        target_resource: format!("pod-{priority}"),
        resource_kind: ResourceKind::Pod,
        tool_hints: vec!["get_logs".to_string(), "kubectl_describe".to_string()],
    }
}

pub(crate) fn final_report(root_cause: &str) -> FinalReport {
    FinalReport {
        root_cause: root_cause.to_string(),
        affected_resources: vec!["pod-1".to_string()],
        evidence_summary: "logs show repeated connection refusals".to_string(),
        investigation_summary: "workers agreed on the database".to_string(),
        detected: true,
        localized_resources: vec!["pod-1".to_string()],
        inconclusive: false,
    }
}

pub(crate) fn request_tasks(priorities: &[u32]) -> SupervisorDecision {
    SupervisorDecision {
        final_report: None,
        tasks_to_execute: priorities.to_vec(),
    }
}

pub(crate) fn finalize(root_cause: &str) -> SupervisorDecision {
    SupervisorDecision {
        final_report: Some(final_report(root_cause)),
        tasks_to_execute: Vec::new(),
    }
}

fn tool_call(name: &str) -> ToolInvocation {
    ToolInvocation {
        tool_name: name.to_string(),
        args: serde_json::Map::new(),
        reasoning: Some("look for recent errors".to_string()),
    }
}

#[async_trait]
impl ReasoningOracle for ScriptedOracle {
    async fn extract_symptoms(&self, _ctx: &TriageContext) -> Result<SymptomList, OracleError> {
        self.triage_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SymptomList {
            symptoms: self.symptoms.clone(),
        })
    }

    async fn plan_tasks(&self, _ctx: &PlanningContext) -> Result<TaskPlan, OracleError> {
        Ok(TaskPlan {
            tasks: self.plan.clone(),
        })
    }

    async fn next_action(&self, ctx: &WorkerContext) -> Result<WorkerDecision, OracleError> {
        if let Ok(mut budgets) = self.worker_budgets.lock() {
            budgets.push((ctx.tool_calls_count, ctx.budget_status.clone()));
        }
        match &self.worker {
            WorkerScript::CallsThenSubmit(n) if ctx.tool_calls_count < *n => {
                Ok(WorkerDecision::ToolCalls {
                    tool_calls: vec![tool_call("get_logs")],
                })
            }
            WorkerScript::CallsThenSubmit(_) => Ok(WorkerDecision::Submit {
                diagnosis: format!("{} is crash looping on a bad config", ctx.task.target_resource),
                reasoning: format!("seen after {} tool calls", ctx.tool_calls_count),
            }),
            WorkerScript::NeverSubmit { per_turn } => Ok(WorkerDecision::ToolCalls {
                tool_calls: (0..*per_turn).map(|_| tool_call("get_logs")).collect(),
            }),
            WorkerScript::DisallowedTools => Ok(WorkerDecision::ToolCalls {
                tool_calls: vec![tool_call("kubectl_delete")],
            }),
            WorkerScript::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(OracleError::Timeout(60_000))
            }
            WorkerScript::Fail => Err(OracleError::Transport("oracle offline".to_string())),
        }
    }

    async fn summarize_step(&self, ctx: &SummaryContext) -> Result<StepSummary, OracleError> {
        if self.fail_summaries {
            return Err(OracleError::Schema("missing prev_step".to_string()));
        }
        Ok(StepSummary {
            insight: format!("{} reported: {}", ctx.tool_name, ctx.tool_output),
            prev_step: format!("Checked {} with {}", ctx.target_resource, ctx.tool_name),
        })
    }

    async fn supervise(
        &self,
        ctx: &SupervisorContext,
    ) -> Result<SupervisorDecision, OracleError> {
        self.supervisor_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut contexts) = self.supervisor_contexts.lock() {
            contexts.push(ctx.clone());
        }
        let queued = self
            .supervisor_queue
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        if let Some(decision) = queued {
            return Ok(decision);
        }
        match self.supervisor_fallback {
            SupervisorFallback::Finalize => Ok(finalize("config map points at the wrong database")),
            SupervisorFallback::RequestOpenTasks => Ok(SupervisorDecision {
                final_report: None,
                tasks_to_execute: ctx
                    .tasks
                    .iter()
                    .filter(|task| !task.status.is_completed())
                    .map(|task| task.priority)
                    .collect(),
            }),
            SupervisorFallback::RequestCompleted => Ok(request_tasks(&[1])),
            SupervisorFallback::Empty => Ok(SupervisorDecision::default()),
            SupervisorFallback::Fail => Err(OracleError::Transport("supervisor offline".to_string())),
        }
    }
}

/// Tool transport that echoes and can fail chosen tools
#[derive(Default)]
pub(crate) struct ScriptedTools {
    pub failing: BTreeSet<String>,
    pub invocations: AtomicU32,
}

impl ScriptedTools {
    pub fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|n| n.to_string()).collect(),
            invocations: AtomicU32::new(0),
        }
    }

    pub fn invocations(&self) -> u32 {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolTransport for ScriptedTools {
    async fn invoke(
        &self,
        tool_name: &str,
        _args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(tool_name) {
            return Err(ToolError::Execution {
                tool: tool_name.to_string(),
                message: "connection reset".to_string(),
            });
        }
        Ok(format!("{tool_name} ok"))
    }
}

pub(crate) fn test_config() -> InvestigationConfig {
    InvestigationConfig {
        oracle_call_timeout_ms: 500,
        tool_call_timeout_ms: 500,
        worker_timeout_ms: 2_000,
        incident_deadline_ms: 10_000,
        ..InvestigationConfig::default()
    }
}

pub(crate) fn test_worker(
    oracle: Arc<ScriptedOracle>,
    tools: Arc<ScriptedTools>,
    max_tool_calls: u32,
) -> InvestigationWorker {
    let settings = WorkerSettings {
        max_tool_calls,
        summary_max_chars: 150,
        oracle: CallPolicy {
            retries: 1,
            timeout: Duration::from_millis(200),
        },
        tool_retries: 2,
        tool_timeout: Duration::from_millis(200),
    };
    InvestigationWorker::new(oracle, tools, Arc::new(ToolRegistry::default()), settings)
}

pub(crate) fn test_orchestrator(
    oracle: Arc<ScriptedOracle>,
    config: InvestigationConfig,
) -> Orchestrator {
    Orchestrator::new(oracle, Arc::new(ScriptedTools::default()), config)
}

pub(crate) fn incident() -> IncidentContext {
    IncidentContext {
        app_name: "hotel-reservation".to_string(),
        app_summary: "Microservice hotel booking app".to_string(),
        target_namespace: "test-hotel-reservation".to_string(),
        trace_service_starting_point: Some("frontend".to_string()),
    }
}

pub(crate) fn request() -> InvestigationRequest {
    InvestigationRequest {
        context: incident(),
        ..InvestigationRequest::default()
    }
}

pub(crate) async fn setup_test_investigation(
    oracle: Arc<ScriptedOracle>,
) -> ActorRef<InvestigationMsg> {
    setup_test_investigation_with(oracle, test_config()).await
}

pub(crate) async fn setup_test_investigation_with(
    oracle: Arc<ScriptedOracle>,
    config: InvestigationConfig,
) -> ActorRef<InvestigationMsg> {
    let args = InvestigationArguments {
        orchestrator: test_orchestrator(oracle, config),
    };
    let (actor_ref, _handle) = Actor::spawn(None, InvestigationActor, args).await.unwrap();
    actor_ref
}
