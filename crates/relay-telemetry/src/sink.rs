use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::span::Span;

#[derive(Debug, thiserror::Error)]
pub enum TraceEmitError {
    #[error("trace collector rejected the tree: status {0}")]
    Rejected(u16),
    #[error("trace transport error: {0}")]
    Transport(String),
}

/// Destination for finished span trees. Emission failures must never affect
/// the user-visible response — callers log and move on.
#[async_trait]
pub trait TraceSink: Send + Sync {
    async fn emit(&self, span: &Span) -> Result<(), TraceEmitError>;
}

/// POSTs each span tree as JSON to the collector endpoint.
pub struct HttpTraceSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTraceSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl TraceSink for HttpTraceSink {
    async fn emit(&self, span: &Span) -> Result<(), TraceEmitError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(span)
            .send()
            .await
            .map_err(|e| TraceEmitError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TraceEmitError::Rejected(response.status().as_u16()));
        }
        Ok(())
    }
}

/// Discards every tree. Used when no collector endpoint is configured.
pub struct NullSink;

#[async_trait]
impl TraceSink for NullSink {
    async fn emit(&self, _span: &Span) -> Result<(), TraceEmitError> {
        Ok(())
    }
}

/// Keeps emitted trees in memory for assertions.
#[derive(Default)]
pub struct CollectingSink {
    spans: Mutex<Vec<Span>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<Span> {
        self.spans.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.spans.lock().len()
    }
}

#[async_trait]
impl TraceSink for CollectingSink {
    async fn emit(&self, span: &Span) -> Result<(), TraceEmitError> {
        self.spans.lock().push(span.clone());
        Ok(())
    }
}
