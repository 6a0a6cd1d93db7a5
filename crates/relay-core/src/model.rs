use async_trait::async_trait;

use crate::tools::{ToolCall, ToolDescriptor};
use crate::turns::Turn;

/// What the model produced for one reasoning step.
///
/// The loop's tie-break rule lives here: if the model emits both text and a
/// tool call in the same step, the tool call wins and the text is discarded —
/// the model wants to verify before answering.
#[derive(Clone, Debug, Default)]
pub struct ModelOutput {
    pub text: Option<String>,
    pub tool_call: Option<ToolCall>,
}

impl ModelOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_call: None,
        }
    }

    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            text: None,
            tool_call: Some(call),
        }
    }

    /// Apply the tie-break: a present tool call takes precedence over text.
    pub fn resolve(self) -> StepDecision {
        match (self.tool_call, self.text) {
            (Some(call), _) => StepDecision::CallTool(call),
            (None, Some(text)) => StepDecision::Answer(text),
            (None, None) => StepDecision::Answer(String::new()),
        }
    }
}

/// The resolved outcome of one THINKING state.
#[derive(Clone, Debug)]
pub enum StepDecision {
    Answer(String),
    CallTool(ToolCall),
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("model request invalid: {0}")]
    InvalidRequest(String),
    #[error("model transport error: {0}")]
    Transport(String),
    #[error("model returned malformed output: {0}")]
    MalformedOutput(String),
}

/// Seam to the hosted model. Implementations are request/response: the full
/// turn history plus tool descriptors go in, one step's output comes out.
#[async_trait]
pub trait ModelClient: Send + Sync {
    fn model_id(&self) -> &str;

    async fn complete(
        &self,
        history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<ModelOutput, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ToolCallId;

    fn call(name: &str) -> ToolCall {
        ToolCall {
            id: ToolCallId::new(),
            name: name.into(),
            parameters: serde_json::json!({}),
        }
    }

    #[test]
    fn text_only_resolves_to_answer() {
        match ModelOutput::text("done").resolve() {
            StepDecision::Answer(text) => assert_eq!(text, "done"),
            other => panic!("expected Answer, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_only_resolves_to_call() {
        match ModelOutput::tool_call(call("search")).resolve() {
            StepDecision::CallTool(tc) => assert_eq!(tc.name, "search"),
            other => panic!("expected CallTool, got {other:?}"),
        }
    }

    #[test]
    fn tool_call_wins_over_text() {
        let output = ModelOutput {
            text: Some("let me check first".into()),
            tool_call: Some(call("search")),
        };
        match output.resolve() {
            StepDecision::CallTool(tc) => assert_eq!(tc.name, "search"),
            other => panic!("tool call must take precedence, got {other:?}"),
        }
    }

    #[test]
    fn empty_output_resolves_to_empty_answer() {
        match ModelOutput::default().resolve() {
            StepDecision::Answer(text) => assert!(text.is_empty()),
            other => panic!("expected Answer, got {other:?}"),
        }
    }
}
