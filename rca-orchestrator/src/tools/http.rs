//! HTTP tool transport
//!
//! Talks to the cluster tool server: `POST {base_url}/tools/invoke` with
//! `{"tool": name, "args": {...}}`, answered by `{"content": "..."}` or
//! `{"error": "..."}`.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use super::{ToolError, ToolTransport};

#[derive(Debug, Deserialize)]
struct InvokeResponse {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpToolTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpToolTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ToolError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn invoke_url(&self) -> String {
        format!("{}/tools/invoke", self.base_url)
    }
}

#[async_trait]
impl ToolTransport for HttpToolTransport {
    async fn invoke(
        &self,
        tool_name: &str,
        args: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, ToolError> {
        let body = serde_json::json!({
            "tool": tool_name,
            "args": args,
        });

        let response = self
            .http
            .post(self.invoke_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::Transport(format!("status {}: {}", status, body)));
        }

        let payload: InvokeResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Transport(format!("undecodable tool response: {e}")))?;

        match (payload.content, payload.error) {
            (_, Some(message)) => Err(ToolError::Execution {
                tool: tool_name.to_string(),
                message,
            }),
            (Some(content), None) => Ok(content),
            (None, None) => Ok(String::new()),
        }
    }
}
