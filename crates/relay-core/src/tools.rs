use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ids::ToolCallId;

/// Tool descriptor as advertised by the gateway and handed to the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// A tool call the model asked for. One per reasoning step at most.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub name: String,
    pub parameters: serde_json::Value,
}

/// Record of one gateway invocation. Immutable once the outcome is recorded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub parameters: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolErrorKind>,
}

impl ToolInvocation {
    pub fn succeeded(
        tool_name: impl Into<String>,
        parameters: serde_json::Value,
        result: serde_json::Value,
        duration: Duration,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            result: Some(result),
            duration,
            error: None,
        }
    }

    pub fn failed(
        tool_name: impl Into<String>,
        parameters: serde_json::Value,
        error: ToolErrorKind,
        duration: Duration,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            parameters,
            result: None,
            duration,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Failure classes the gateway adapter reports. The adapter never retries;
/// a failed call surfaces to the reasoning loop as ordinary turn content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    Timeout,
    Unavailable,
    Unauthorized,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Unauthorized => write!(f, "unauthorized"),
        }
    }
}

#[derive(Clone, Debug, thiserror::Error)]
pub enum ToolError {
    #[error("tool '{tool}' timed out after {timeout:?}")]
    Timeout { tool: String, timeout: Duration },
    #[error("tool '{tool}' unavailable: {reason}")]
    Unavailable { tool: String, reason: String },
    #[error("tool '{tool}' rejected the bearer token")]
    Unauthorized { tool: String },
}

impl ToolError {
    pub fn kind(&self) -> ToolErrorKind {
        match self {
            Self::Timeout { .. } => ToolErrorKind::Timeout,
            Self::Unavailable { .. } => ToolErrorKind::Unavailable,
            Self::Unauthorized { .. } => ToolErrorKind::Unauthorized,
        }
    }

    pub fn tool(&self) -> &str {
        match self {
            Self::Timeout { tool, .. } | Self::Unavailable { tool, .. } | Self::Unauthorized { tool } => tool,
        }
    }
}

/// Serde helper for Duration as milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_duration_serializes_as_ms() {
        let inv = ToolInvocation::succeeded(
            "web_search",
            serde_json::json!({"query": "rust"}),
            serde_json::json!({"hits": 3}),
            Duration::from_millis(420),
        );
        let json = serde_json::to_value(&inv).unwrap();
        assert_eq!(json["duration"], 420);

        let parsed: ToolInvocation = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.duration, Duration::from_millis(420));
        assert!(!parsed.is_error());
    }

    #[test]
    fn failed_invocation_carries_kind() {
        let inv = ToolInvocation::failed(
            "web_search",
            serde_json::json!({}),
            ToolErrorKind::Timeout,
            Duration::from_secs(30),
        );
        assert!(inv.is_error());
        assert_eq!(inv.error, Some(ToolErrorKind::Timeout));
        assert!(inv.result.is_none());
    }

    #[test]
    fn error_kind_mapping() {
        let err = ToolError::Timeout {
            tool: "calc".into(),
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.kind(), ToolErrorKind::Timeout);
        assert_eq!(err.tool(), "calc");

        let err = ToolError::Unauthorized { tool: "calc".into() };
        assert_eq!(err.kind(), ToolErrorKind::Unauthorized);
    }

    #[test]
    fn error_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&ToolErrorKind::Timeout).unwrap(), r#""timeout""#);
        assert_eq!(serde_json::to_string(&ToolErrorKind::Unavailable).unwrap(), r#""unavailable""#);
        assert_eq!(serde_json::to_string(&ToolErrorKind::Unauthorized).unwrap(), r#""unauthorized""#);
    }

    #[test]
    fn error_display_names_the_tool() {
        let err = ToolError::Unavailable {
            tool: "web_search".into(),
            reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("web_search"));
        assert!(msg.contains("connection refused"));
    }
}
