//! Investigation configuration
//!
//! Resolution order:
//! 1. `RCA_CONFIG_PATH` if set
//! 2. `config/investigation.toml` in the current directory or any ancestor
//! 3. the built-in example catalog
//!
//! Environment overrides are applied on top of whichever file was loaded.

use serde::{Deserialize, Serialize};
use shared_types::InvestigationLimits;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tools::DEFAULT_ALLOWED_TOOLS;

pub const DEFAULT_CONFIG_PATH: &str = "config/investigation.toml";
const BUILTIN_CONFIG_TOML: &str = include_str!("../config/investigation.example.toml");

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OracleEndpointConfig {
    pub base_url: String,
    /// Name of the environment variable holding the bearer token
    pub api_key_env: Option<String>,
    pub model: String,
}

impl Default for OracleEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8100".to_string(),
            api_key_env: Some("RCA_ORACLE_API_KEY".to_string()),
            model: "gpt-5-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolEndpointConfig {
    pub base_url: String,
    pub allowed: Vec<String>,
}

impl Default for ToolEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            allowed: DEFAULT_ALLOWED_TOOLS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InvestigationConfig {
    pub max_tool_calls_per_task: u32,
    pub max_parallel_tasks_per_iteration: usize,
    pub max_supervisor_iterations: u32,
    /// Cumulative dispatch cap for one incident
    pub max_task_count: usize,
    pub oracle_retries: u32,
    pub tool_retries: u32,
    pub oracle_call_timeout_ms: u64,
    pub tool_call_timeout_ms: u64,
    pub worker_timeout_ms: u64,
    pub incident_deadline_ms: u64,
    pub summary_max_chars: usize,
    pub bind_addr: String,
    pub reports_dir: Option<PathBuf>,
    /// Completed reports kept in memory; older ones survive only in `reports_dir`
    pub max_retained_reports: usize,
    pub oracle: OracleEndpointConfig,
    pub tools: ToolEndpointConfig,
}

impl Default for InvestigationConfig {
    fn default() -> Self {
        Self {
            max_tool_calls_per_task: 8,
            max_parallel_tasks_per_iteration: 3,
            max_supervisor_iterations: 10,
            max_task_count: 12,
            oracle_retries: 1,
            tool_retries: 2,
            oracle_call_timeout_ms: 120_000,
            tool_call_timeout_ms: 30_000,
            worker_timeout_ms: 600_000,
            incident_deadline_ms: 1_800_000,
            summary_max_chars: 150,
            bind_addr: "0.0.0.0:8080".to_string(),
            reports_dir: None,
            max_retained_reports: 256,
            oracle: OracleEndpointConfig::default(),
            tools: ToolEndpointConfig::default(),
        }
    }
}

impl InvestigationConfig {
    /// Load from file + environment, then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit_path = std::env::var("RCA_CONFIG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let mut config = match explicit_path.or_else(|| find_default_config_path(DEFAULT_CONFIG_PATH)) {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::info!("No investigation config file found; using built-in defaults");
                Self::built_in()
            }
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_toml_str(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })?;
        tracing::info!(path = %path.display(), "Loaded investigation config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    fn built_in() -> Self {
        Self::from_toml_str(BUILTIN_CONFIG_TOML).unwrap_or_else(|err| {
            tracing::error!(error = %err, "Failed to parse built-in investigation config");
            Self::default()
        })
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        override_parsed(&lookup, "MAX_TOOL_CALLS", &mut self.max_tool_calls_per_task);
        override_parsed(
            &lookup,
            "RCA_TASKS_PER_ITERATION",
            &mut self.max_parallel_tasks_per_iteration,
        );
        override_parsed(
            &lookup,
            "RCA_MAX_SUPERVISOR_ITERATIONS",
            &mut self.max_supervisor_iterations,
        );

        if let Some(url) = non_empty(&lookup, "RCA_ORACLE_URL") {
            self.oracle.base_url = url;
        }
        if let Some(url) = non_empty(&lookup, "RCA_TOOLS_URL") {
            self.tools.base_url = url;
        }
        if let Some(dir) = non_empty(&lookup, "RCA_REPORTS_DIR") {
            self.reports_dir = Some(PathBuf::from(dir));
        }
        if let Some(addr) = non_empty(&lookup, "RCA_BIND_ADDR") {
            self.bind_addr = addr;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("max_tool_calls_per_task", self.max_tool_calls_per_task as u64),
            (
                "max_parallel_tasks_per_iteration",
                self.max_parallel_tasks_per_iteration as u64,
            ),
            ("max_supervisor_iterations", self.max_supervisor_iterations as u64),
            ("max_task_count", self.max_task_count as u64),
            ("oracle_call_timeout_ms", self.oracle_call_timeout_ms),
            ("tool_call_timeout_ms", self.tool_call_timeout_ms),
            ("worker_timeout_ms", self.worker_timeout_ms),
            ("incident_deadline_ms", self.incident_deadline_ms),
            ("summary_max_chars", self.summary_max_chars as u64),
            ("max_retained_reports", self.max_retained_reports as u64),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if self.tools.allowed.is_empty() {
            return Err(ConfigError::Invalid {
                field: "tools.allowed",
                reason: "at least one investigative tool is required".to_string(),
            });
        }
        Ok(())
    }

    /// Budgets recorded in every incident report
    pub fn limits(&self) -> InvestigationLimits {
        InvestigationLimits {
            max_tool_calls_per_task: self.max_tool_calls_per_task,
            max_parallel_tasks_per_iteration: self.max_parallel_tasks_per_iteration,
            max_supervisor_iterations: self.max_supervisor_iterations,
            max_task_count: self.max_task_count,
        }
    }

    pub fn oracle_call_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_call_timeout_ms)
    }

    pub fn tool_call_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_call_timeout_ms)
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_millis(self.worker_timeout_ms)
    }

    pub fn incident_deadline(&self) -> Duration {
        Duration::from_millis(self.incident_deadline_ms)
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.trim().is_empty())
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let Some(raw) = non_empty(lookup, key) else {
        return;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(key, value = %raw, "Ignoring unparseable config override"),
    }
}

fn find_default_config_path(relative_path: &str) -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;
    loop {
        let candidate = current.join(relative_path);
        if candidate.exists() && candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            break;
        }
    }
    None
}
