//! Tool transport seam for investigation workers
//!
//! Workers never execute investigative actions themselves. They ask a
//! `ToolTransport` to invoke a named, read-only tool and get back raw text.
//! The `ToolRegistry` is the global allow-list those names are checked against.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

pub mod http;

pub use http::HttpToolTransport;

/// Terminal action a worker uses to submit its diagnosis
pub const SUBMIT_DIAGNOSIS_TOOL: &str = "submit_final_diagnosis";

pub const DEFAULT_ALLOWED_TOOLS: &[&str] = &[
    // cluster state
    "kubectl_get",
    "kubectl_describe",
    "explain_resource",
    "list_api_resources",
    "ping",
    // metrics, topology, logs, traces
    "get_metrics",
    "get_metrics_range",
    "get_pods_from_service",
    "get_cluster_pods_and_services",
    "get_services_used_by",
    "get_dependencies",
    "get_logs",
    "get_traces",
    "get_trace",
];

pub type SharedToolTransport = Arc<dyn ToolTransport>;

/// One proposed tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub tool_name: String,
    #[serde(default)]
    pub args: serde_json::Map<String, serde_json::Value>,
    /// Hypothesis the call is meant to test
    #[serde(default)]
    pub reasoning: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("tool not allowed: {0}")]
    NotAllowed(String),
    #[error("tool transport failed: {0}")]
    Transport(String),
    #[error("tool {tool} returned an error: {message}")]
    Execution { tool: String, message: String },
    #[error("tool call timed out after {0}ms")]
    Timeout(u64),
}

#[async_trait]
pub trait ToolTransport: Send + Sync {
    /// Execute `tool_name` with `args` and return its raw textual result.
    async fn invoke(
        &self,
        tool_name: &str,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError>;
}

/// Fixed global registry of read-only investigative tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRegistry {
    allowed: BTreeSet<String>,
}

impl ToolRegistry {
    pub fn new<I, S>(allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed: allowed
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| name != SUBMIT_DIAGNOSIS_TOOL)
                .collect(),
        }
    }

    pub fn is_allowed(&self, tool_name: &str) -> bool {
        self.allowed.contains(tool_name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.allowed.iter().cloned().collect()
    }

    /// Tool list as presented to the reasoning oracle
    pub fn describe(&self) -> String {
        let mut lines: Vec<String> = self.allowed.iter().map(|name| format!("- {name}")).collect();
        lines.push(format!(
            "- {SUBMIT_DIAGNOSIS_TOOL} (diagnosis, reasoning): submit when the investigation is complete"
        ));
        lines.join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_TOOLS.iter().copied())
    }
}
