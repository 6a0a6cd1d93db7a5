use async_trait::async_trait;
use dashmap::DashMap;

use relay_core::ids::{ActorId, SessionId};
use relay_core::turns::Turn;

use crate::{SessionStore, StoreError};

/// In-process store for tests and local runs. Same per-key ordering contract
/// as the remote store.
#[derive(Default)]
pub struct InMemorySessionStore {
    histories: DashMap<(String, String), Vec<Turn>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(actor: &ActorId, session: &SessionId) -> (String, String) {
        (actor.to_string(), session.to_string())
    }

    /// Number of distinct `(actor, session)` histories.
    pub fn history_count(&self) -> usize {
        self.histories.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_turns(
        &self,
        actor: &ActorId,
        session: &SessionId,
    ) -> Result<Vec<Turn>, StoreError> {
        Ok(self
            .histories
            .get(&Self::key(actor, session))
            .map(|h| h.clone())
            .unwrap_or_default())
    }

    async fn append_turns(
        &self,
        actor: &ActorId,
        session: &SessionId,
        turns: &[Turn],
    ) -> Result<(), StoreError> {
        self.histories
            .entry(Self::key(actor, session))
            .or_default()
            .extend_from_slice(turns);
        Ok(())
    }
}
