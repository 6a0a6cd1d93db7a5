use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use relay_core::ids::ToolCallId;
use relay_core::model::{ModelClient, ModelError, ModelOutput};
use relay_core::tools::{ToolCall, ToolDescriptor};
use relay_core::turns::Turn;

/// Pre-programmed steps for deterministic testing without API calls.
pub enum MockStep {
    /// Return a model output.
    Output(ModelOutput),
    /// Return an error from the complete() call itself.
    Error(ModelError),
    /// Wait a duration, then yield the inner step.
    Delay(Duration, Box<MockStep>),
}

impl MockStep {
    /// Convenience: a final text answer.
    pub fn answer(text: &str) -> Self {
        Self::Output(ModelOutput::text(text))
    }

    /// Convenience: a tool call with a fresh call id.
    pub fn call(tool: &str, parameters: serde_json::Value) -> Self {
        Self::Output(ModelOutput::tool_call(ToolCall {
            id: ToolCallId::new(),
            name: tool.into(),
            parameters,
        }))
    }

    /// Convenience: text and a tool call in the same step.
    pub fn call_with_text(tool: &str, parameters: serde_json::Value, text: &str) -> Self {
        Self::Output(ModelOutput {
            text: Some(text.into()),
            tool_call: Some(ToolCall {
                id: ToolCallId::new(),
                name: tool.into(),
                parameters,
            }),
        })
    }

    /// Convenience: wrap any step with a delay.
    pub fn delayed(delay: Duration, inner: MockStep) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock model that returns pre-programmed steps in sequence.
pub struct MockModel {
    steps: Vec<MockStep>,
    call_count: AtomicUsize,
}

impl MockModel {
    pub fn new(steps: Vec<MockStep>) -> Self {
        Self {
            steps,
            call_count: AtomicUsize::new(0),
        }
    }

    /// A model that answers the same text forever.
    pub fn always(text: &str) -> Self {
        // One step per possible call; a reasoning loop never asks more than
        // its step limit, so a generous count is enough.
        Self::new((0..64).map(|_| MockStep::answer(text)).collect())
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ModelClient for MockModel {
    fn model_id(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        _history: &[Turn],
        _tools: &[ToolDescriptor],
    ) -> Result<ModelOutput, ModelError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        let mut current = self.steps.get(idx).ok_or_else(|| {
            ModelError::InvalidRequest(format!("MockModel: no step configured for call {idx}"))
        })?;

        loop {
            match current {
                MockStep::Output(output) => return Ok(output.clone()),
                MockStep::Error(e) => return Err(e.clone()),
                MockStep::Delay(duration, inner) => {
                    tokio::time::sleep(*duration).await;
                    current = inner;
                }
            }
        }
    }
}
