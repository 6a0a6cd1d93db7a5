use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use relay_core::security::BearerToken;
use relay_core::tools::{ToolCall, ToolDescriptor, ToolError};

use crate::ToolGateway;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    message: String,
}

#[derive(Deserialize)]
struct ToolListing {
    tools: Vec<ToolEntry>,
}

#[derive(Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "inputSchema", default)]
    input_schema: serde_json::Value,
}

/// JSON-RPC client for the tool gateway.
///
/// Every request carries the caller's bearer token; the gateway enforces its
/// own authorization and the adapter just reports the verdict. Calls are
/// bounded by `call_timeout` and never retried here.
pub struct HttpToolGateway {
    client: reqwest::Client,
    url: String,
    call_timeout: Duration,
    next_id: AtomicU64,
}

impl HttpToolGateway {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_CALL_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, call_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            call_timeout,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn rpc(
        &self,
        tool: &str,
        method: &str,
        params: serde_json::Value,
        token: &BearerToken,
    ) -> Result<serde_json::Value, ToolError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token.expose())
            .timeout(self.call_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::Timeout {
                        tool: tool.to_string(),
                        timeout: self.call_timeout,
                    }
                } else {
                    ToolError::Unavailable {
                        tool: tool.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ToolError::Unauthorized {
                tool: tool.to_string(),
            });
        }
        if !status.is_success() {
            return Err(ToolError::Unavailable {
                tool: tool.to_string(),
                reason: format!("gateway returned status {}", status.as_u16()),
            });
        }

        let rpc: RpcResponse = response.json().await.map_err(|e| ToolError::Unavailable {
            tool: tool.to_string(),
            reason: format!("malformed gateway response: {e}"),
        })?;

        if let Some(err) = rpc.error {
            return Err(ToolError::Unavailable {
                tool: tool.to_string(),
                reason: err.message,
            });
        }
        rpc.result.ok_or_else(|| ToolError::Unavailable {
            tool: tool.to_string(),
            reason: "gateway response had neither result nor error".into(),
        })
    }
}

#[async_trait]
impl ToolGateway for HttpToolGateway {
    #[instrument(skip(self, token))]
    async fn list_tools(&self, token: &BearerToken) -> Result<Vec<ToolDescriptor>, ToolError> {
        let result = self
            .rpc("tools/list", "tools/list", json!({}), token)
            .await?;
        let listing: ToolListing =
            serde_json::from_value(result).map_err(|e| ToolError::Unavailable {
                tool: "tools/list".into(),
                reason: format!("malformed tool listing: {e}"),
            })?;
        Ok(listing
            .tools
            .into_iter()
            .map(|t| ToolDescriptor {
                name: t.name,
                description: t.description,
                parameters_schema: t.input_schema,
            })
            .collect())
    }

    #[instrument(skip(self, call, token), fields(tool = %call.name))]
    async fn invoke(
        &self,
        call: &ToolCall,
        token: &BearerToken,
    ) -> Result<serde_json::Value, ToolError> {
        self.rpc(
            &call.name,
            "tools/call",
            json!({
                "name": call.name,
                "arguments": call.parameters,
            }),
            token,
        )
        .await
    }
}
