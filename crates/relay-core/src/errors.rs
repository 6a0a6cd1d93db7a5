/// Authentication failures. Always fatal: the cycle terminates before any
/// session-store or gateway access, so an auth failure has zero side effects.
#[derive(Clone, Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("token signature invalid")]
    BadSignature,
    #[error("token expired")]
    Expired,
    #[error("issuer mismatch: {0}")]
    IssuerMismatch(String),
    #[error("audience mismatch: {0}")]
    AudienceMismatch(String),
    #[error("token subject does not match actor '{actor}'")]
    ActorMismatch { actor: String },
    #[error("discovery document unavailable: {0}")]
    DiscoveryUnavailable(String),
    #[error("no verification key for kid '{0}'")]
    UnknownKey(String),
}

impl AuthError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::Malformed(_) => "malformed",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired",
            Self::IssuerMismatch(_) => "issuer_mismatch",
            Self::AudienceMismatch(_) => "audience_mismatch",
            Self::ActorMismatch { .. } => "actor_mismatch",
            Self::DiscoveryUnavailable(_) => "discovery_unavailable",
            Self::UnknownKey(_) => "unknown_key",
        }
    }
}
