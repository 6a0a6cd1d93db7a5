use relay_core::errors::AuthError;
use relay_core::ids::MIN_SESSION_ID_LEN;
use relay_core::model::ModelError;

/// Fatal cycle outcomes. Store and gateway failures are not here — they
/// degrade into response flags and turn content instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("session '{session}' already has a cycle in flight")]
    SessionBusy { session: String },

    #[error("session id '{session}' is malformed: minimum length is {}", MIN_SESSION_ID_LEN)]
    InvalidSessionId { session: String },
}

impl EngineError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::Model(_) => "model",
            Self::SessionBusy { .. } => "session_busy",
            Self::InvalidSessionId { .. } => "invalid_session_id",
        }
    }
}
