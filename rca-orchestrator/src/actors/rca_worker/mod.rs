//! Investigation worker - resolves one task into one result
//!
//! Each worker runs an isolated bounded loop:
//!
//! ```text
//! REASON → (TOOL_CALL → SUMMARIZE)* → SUBMIT
//! ```
//!
//! - REASON asks the oracle for the next action given the task, the budget
//!   status and the accumulated insight/step history.
//! - Every tool result is folded into that history by a narrow summarization
//!   call, bounded to `summary_max_chars` per field.
//! - Once the budget is exceeded the oracle gets one more turn to submit.
//!   After that the worker returns an inconclusive result.
//!
//! Failures never escape the worker: oracle errors degrade to a
//! `WorkerOutcome::Failed` result, tool errors become insights.

use shared_types::{IncidentContext, InvestigationTask, WorkerOutcome, WorkerResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub mod budget;

pub use budget::ToolBudget;

use crate::config::InvestigationConfig;
use crate::oracle::{
    call_validated, prompts, CallPolicy, CallSite, SharedReasoningOracle, StepSummary,
    SummaryContext, WorkerContext, WorkerDecision,
};
use crate::tools::{
    SharedToolTransport, ToolError, ToolInvocation, ToolRegistry, SUBMIT_DIAGNOSIS_TOOL,
};

pub const BUDGET_EXHAUSTED_DIAGNOSIS: &str = "Investigation inconclusive: budget exhausted";
pub const CANCELLED_DIAGNOSIS: &str = "Investigation inconclusive: cancelled";

/// Limits a worker runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub max_tool_calls: u32,
    pub summary_max_chars: usize,
    pub oracle: CallPolicy,
    pub tool_retries: u32,
    pub tool_timeout: Duration,
}

impl WorkerSettings {
    pub fn from_config(config: &InvestigationConfig) -> Self {
        Self {
            max_tool_calls: config.max_tool_calls_per_task,
            summary_max_chars: config.summary_max_chars,
            oracle: CallPolicy {
                retries: config.oracle_retries,
                timeout: config.oracle_call_timeout(),
            },
            tool_retries: config.tool_retries,
            tool_timeout: config.tool_call_timeout(),
        }
    }
}

#[derive(Clone)]
pub struct InvestigationWorker {
    oracle: SharedReasoningOracle,
    tools: SharedToolTransport,
    registry: Arc<ToolRegistry>,
    settings: WorkerSettings,
}

/// Mutable history of one run, never shared outside the worker
struct WorkerRun {
    priority: u32,
    budget: ToolBudget,
    insights: Vec<String>,
    steps: Vec<String>,
    tool_call_counts: BTreeMap<String, u32>,
}

impl WorkerRun {
    fn new(priority: u32, max_tool_calls: u32) -> Self {
        Self {
            priority,
            budget: ToolBudget::new(max_tool_calls),
            insights: Vec::new(),
            steps: Vec::new(),
            tool_call_counts: BTreeMap::new(),
        }
    }

    fn count(&mut self, tool_name: &str) {
        *self
            .tool_call_counts
            .entry(tool_name.to_string())
            .or_insert(0) += 1;
    }

    fn finish(self, outcome: WorkerOutcome, diagnosis: String, reasoning: String) -> WorkerResult {
        WorkerResult {
            task_priority: self.priority,
            outcome,
            diagnosis,
            reasoning,
            steps: self.steps,
            insights: self.insights,
            tool_call_counts: self.tool_call_counts,
        }
    }
}

impl InvestigationWorker {
    pub fn new(
        oracle: SharedReasoningOracle,
        tools: SharedToolTransport,
        registry: Arc<ToolRegistry>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            oracle,
            tools,
            registry,
            settings,
        }
    }

    /// Run `task` to exactly one result. Cancellation yields a
    /// `WorkerOutcome::Cancelled` placeholder instead of nothing.
    pub async fn run(
        &self,
        incident: &IncidentContext,
        task: &InvestigationTask,
        cancel: CancellationToken,
    ) -> WorkerResult {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(priority = task.priority, "Worker cancelled before submission");
                WorkerResult::placeholder(task.priority, WorkerOutcome::Cancelled, CANCELLED_DIAGNOSIS)
            }
            result = self.investigate(incident, task) => result,
        }
    }

    async fn investigate(&self, incident: &IncidentContext, task: &InvestigationTask) -> WorkerResult {
        let mut run = WorkerRun::new(task.priority, self.settings.max_tool_calls);
        let available_tools = self.registry.describe();

        tracing::info!(
            priority = task.priority,
            target = %task.target_resource,
            budget = self.settings.max_tool_calls,
            "Worker started"
        );

        loop {
            let zone = run.budget.zone();
            let ctx = WorkerContext {
                incident: incident.clone(),
                task: task.clone(),
                tool_calls_count: run.budget.used(),
                investigation_budget: run.budget.limit(),
                budget_status: run.budget.status_text(),
                insights: prompts::render_insights(&run.insights),
                prev_steps: prompts::render_steps(&run.steps),
                available_tools: available_tools.clone(),
            };

            let oracle = &self.oracle;
            let ctx = &ctx;
            let decision = match call_validated(
                CallSite::WorkerNextAction,
                self.settings.oracle,
                move || oracle.next_action(ctx),
            )
            .await
            {
                Ok(decision) => decision,
                Err(err) => {
                    tracing::error!(priority = task.priority, error = %err, "Worker could not obtain next action");
                    return run.finish(
                        WorkerOutcome::Failed,
                        format!("Investigation failed: {err}"),
                        String::new(),
                    );
                }
            };

            match decision {
                WorkerDecision::Submit { diagnosis, reasoning } => {
                    run.count(SUBMIT_DIAGNOSIS_TOOL);
                    tracing::info!(
                        priority = task.priority,
                        tool_calls = run.budget.used(),
                        "Worker submitted diagnosis"
                    );
                    return run.finish(WorkerOutcome::Diagnosed, diagnosis, reasoning);
                }
                WorkerDecision::ToolCalls { tool_calls } => {
                    if zone == prompts::BudgetZone::Exceeded {
                        tracing::warn!(
                            priority = task.priority,
                            proposed = tool_calls.len(),
                            "Worker kept calling tools after budget was exceeded"
                        );
                        let reasoning = format!(
                            "Budget of {} tool calls exhausted without a submission",
                            run.budget.limit()
                        );
                        return run.finish(
                            WorkerOutcome::Inconclusive,
                            BUDGET_EXHAUSTED_DIAGNOSIS.to_string(),
                            reasoning,
                        );
                    }
                    for call in &tool_calls {
                        if !run.budget.try_consume() {
                            tracing::warn!(
                                priority = task.priority,
                                tool = %call.tool_name,
                                "Dropping tool call beyond budget"
                            );
                            break;
                        }
                        self.execute_tool_call(task, call, &mut run).await;
                    }
                }
            }
        }
    }

    /// Execute one already-budgeted call and fold its result into history.
    async fn execute_tool_call(
        &self,
        task: &InvestigationTask,
        call: &ToolInvocation,
        run: &mut WorkerRun,
    ) {
        let tool_name = call.tool_name.as_str();
        if !self.registry.is_allowed(tool_name) {
            let err = ToolError::NotAllowed(tool_name.to_string());
            tracing::warn!(priority = task.priority, tool = %tool_name, "Rejected tool call");
            run.insights.push(format!("tool {tool_name} rejected: {err}"));
            run.steps.push(format!("Attempted disallowed tool {tool_name}"));
            return;
        }

        run.count(tool_name);
        let output = match self.invoke_with_retry(tool_name, &call.args).await {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(priority = task.priority, tool = %tool_name, error = %err, "Tool call failed");
                run.insights.push(format!("tool {tool_name} failed: {err}"));
                run.steps.push(format!("Called {tool_name} (failed)"));
                return;
            }
        };

        let max_chars = self.settings.summary_max_chars;
        let ctx = SummaryContext {
            task_goal: task.goal.clone(),
            target_resource: task.target_resource.clone(),
            tool_name: tool_name.to_string(),
            tool_args: call.args.clone(),
            tool_reasoning: call.reasoning.clone(),
            tool_output: output.clone(),
            insights: prompts::render_insights(&run.insights),
            prev_steps: prompts::render_steps(&run.steps),
            max_chars,
        };
        let oracle = &self.oracle;
        let ctx = &ctx;
        let summary = call_validated(CallSite::WorkerSummary, self.settings.oracle, move || {
            oracle.summarize_step(ctx)
        })
        .await
        .unwrap_or_else(|err| {
            tracing::warn!(priority = task.priority, error = %err, "Summarization failed; keeping raw output");
            let prev_step = match &call.reasoning {
                Some(reasoning) => format!("Called {tool_name}: {reasoning}"),
                None => format!("Called {tool_name}"),
            };
            StepSummary {
                insight: output.clone(),
                prev_step,
            }
        });

        let insight = prompts::truncate_chars(&summary.insight, max_chars);
        if !insight.is_empty() {
            run.insights.push(insight);
        }
        run.steps
            .push(prompts::truncate_chars(&summary.prev_step, max_chars));
    }

    async fn invoke_with_retry(
        &self,
        tool_name: &str,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        let attempts = self.settings.tool_retries + 1;
        let timeout = self.settings.tool_timeout;
        let mut last_error = ToolError::Transport("no attempt made".to_string());

        for attempt in 1..=attempts {
            let outcome = match tokio::time::timeout(timeout, self.tools.invoke(tool_name, args)).await
            {
                Ok(result) => result,
                Err(_) => Err(ToolError::Timeout(timeout.as_millis() as u64)),
            };
            match outcome {
                Ok(output) => return Ok(output),
                Err(err) => {
                    tracing::debug!(tool = %tool_name, attempt, attempts, error = %err, "Tool attempt failed");
                    last_error = err;
                }
            }
        }

        Err(last_error)
    }
}
