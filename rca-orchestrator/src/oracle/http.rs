//! HTTP reasoning oracle
//!
//! One endpoint serves every call site: `POST {base_url}/decide` with
//! `{"call_site": ..., "model": ..., "context": {...}}`. The response body is
//! the typed decision for that call site.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{
    CallSite, OracleError, PlanningContext, ReasoningOracle, StepSummary, SummaryContext,
    SupervisorContext, SupervisorDecision, SymptomList, TaskPlan, TriageContext, WorkerContext,
    WorkerDecision,
};
use crate::config::OracleEndpointConfig;

#[derive(Debug, Clone)]
pub struct HttpReasoningOracle {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpReasoningOracle {
    pub fn new(config: &OracleEndpointConfig, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Transport(format!("failed to build http client: {e}")))?;

        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|env| std::env::var(env).ok())
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                api_key_env = ?config.api_key_env,
                "No oracle API key found; calling oracle without authorization"
            );
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn decide_url(&self) -> String {
        format!("{}/decide", self.base_url)
    }

    async fn decide<C, T>(&self, call_site: CallSite, context: &C) -> Result<T, OracleError>
    where
        C: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = serde_json::json!({
            "call_site": call_site.as_str(),
            "model": self.model,
            "context": context,
        });

        let mut request = self.http.post(self.decide_url()).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Transport(format!("status {}: {}", status, body)));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::Schema(format!("response is not JSON: {e}")))?;
        serde_json::from_value(payload)
            .map_err(|e| OracleError::Schema(format!("{}: {e}", call_site.as_str())))
    }
}

#[async_trait]
impl ReasoningOracle for HttpReasoningOracle {
    async fn extract_symptoms(&self, ctx: &TriageContext) -> Result<SymptomList, OracleError> {
        self.decide(CallSite::Triage, ctx).await
    }

    async fn plan_tasks(&self, ctx: &PlanningContext) -> Result<TaskPlan, OracleError> {
        self.decide(CallSite::Planning, ctx).await
    }

    async fn next_action(&self, ctx: &WorkerContext) -> Result<WorkerDecision, OracleError> {
        self.decide(CallSite::WorkerNextAction, ctx).await
    }

    async fn summarize_step(&self, ctx: &SummaryContext) -> Result<StepSummary, OracleError> {
        self.decide(CallSite::WorkerSummary, ctx).await
    }

    async fn supervise(
        &self,
        ctx: &SupervisorContext,
    ) -> Result<SupervisorDecision, OracleError> {
        self.decide(CallSite::Supervisor, ctx).await
    }
}
