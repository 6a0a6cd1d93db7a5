use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn. The session store treats the sequence of turns for a
/// `(actor, session)` pair as append-only; roles are fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// One conversation turn. Never mutated after creation — the reasoning loop
/// replays the ordered sequence verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::now(TurnRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::now(TurnRole::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::now(TurnRole::Tool, content)
    }

    fn now(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&TurnRole::User).unwrap(), r#""user""#);
        assert_eq!(serde_json::to_string(&TurnRole::Assistant).unwrap(), r#""assistant""#);
        assert_eq!(serde_json::to_string(&TurnRole::Tool).unwrap(), r#""tool""#);
    }

    #[test]
    fn constructors_set_role() {
        assert_eq!(Turn::user("hi").role, TurnRole::User);
        assert_eq!(Turn::assistant("hello").role, TurnRole::Assistant);
        assert_eq!(Turn::tool("result").role, TurnRole::Tool);
    }

    #[test]
    fn serde_roundtrip() {
        let turn = Turn::user("what's the weather?");
        let json = serde_json::to_string(&turn).unwrap();
        let parsed: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(turn, parsed);
    }

    #[test]
    fn timestamps_are_monotonic_enough() {
        let a = Turn::user("first");
        let b = Turn::assistant("second");
        assert!(b.timestamp >= a.timestamp);
    }
}
