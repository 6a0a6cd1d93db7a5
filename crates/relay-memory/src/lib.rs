//! Session-store adapter.
//!
//! The store is a managed external service that owns persisted turns; this
//! crate only reads and appends. Appends are at-least-once with no atomicity
//! across a batch — the orchestrator surfaces a failed append as a
//! persistence gap rather than rolling back the response.

pub mod memory;
pub mod remote;

use async_trait::async_trait;

use relay_core::ids::{ActorId, SessionId};
use relay_core::turns::Turn;

pub use memory::InMemorySessionStore;
pub use remote::RemoteSessionStore;

#[derive(Clone, Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store unavailable: {0}")]
    Unavailable(String),
    #[error("session store rejected request: status {status}")]
    Rejected { status: u16 },
    #[error("session store payload malformed: {0}")]
    Malformed(String),
}

/// Ordered turn history keyed by `(actor, session)`.
///
/// `get_turns` returns turns in exactly the order they were appended; a
/// missing history is an empty sequence, not an error. Sessions are logically
/// single-writer — per-key ordering is all an implementation must provide.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get_turns(
        &self,
        actor: &ActorId,
        session: &SessionId,
    ) -> Result<Vec<Turn>, StoreError>;

    async fn append_turns(
        &self,
        actor: &ActorId,
        session: &SessionId,
        turns: &[Turn],
    ) -> Result<(), StoreError>;
}
