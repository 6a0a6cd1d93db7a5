//! Tool-gateway adapter.
//!
//! The gateway is a bearer-gated RPC endpoint that fronts every tool the
//! agent may call. The adapter is deliberately thin: one call, one bounded
//! wait, no automatic retry — retry policy belongs to the reasoning loop,
//! which sees failures as ordinary turn content and may re-issue the call.

mod client;

use async_trait::async_trait;

use relay_core::security::BearerToken;
use relay_core::tools::{ToolCall, ToolDescriptor, ToolError};

pub use client::HttpToolGateway;

/// Seam the reasoning loop calls tools through.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Tool descriptors to hand to the model.
    async fn list_tools(&self, token: &BearerToken) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Invoke one tool. Bounded by the per-call timeout.
    async fn invoke(
        &self,
        call: &ToolCall,
        token: &BearerToken,
    ) -> Result<serde_json::Value, ToolError>;
}
