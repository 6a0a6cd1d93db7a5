use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use relay_core::ids::{ActorId, SessionId};
use relay_core::turns::Turn;

use crate::{SessionStore, StoreError};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize, Deserialize)]
struct TurnsPayload {
    turns: Vec<Turn>,
}

/// HTTP client for the managed session store. Histories live under a memory
/// resource id; the endpoint layout is
/// `{base}/memories/{memory_id}/actors/{actor}/sessions/{session}/turns`.
pub struct RemoteSessionStore {
    client: reqwest::Client,
    base_url: String,
    memory_id: String,
}

impl RemoteSessionStore {
    pub fn new(base_url: impl Into<String>, memory_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            memory_id: memory_id.into(),
        }
    }

    fn turns_url(&self, actor: &ActorId, session: &SessionId) -> String {
        format!(
            "{}/memories/{}/actors/{}/sessions/{}/turns",
            self.base_url.trim_end_matches('/'),
            self.memory_id,
            actor,
            session,
        )
    }
}

#[async_trait]
impl SessionStore for RemoteSessionStore {
    #[instrument(skip(self), fields(actor_id = %actor, session_id = %session))]
    async fn get_turns(
        &self,
        actor: &ActorId,
        session: &SessionId,
    ) -> Result<Vec<Turn>, StoreError> {
        let response = self
            .client
            .get(self.turns_url(actor, session))
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        // A session with no history yet is not an error.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(StoreError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let payload: TurnsPayload = response
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        Ok(payload.turns)
    }

    #[instrument(skip(self, turns), fields(actor_id = %actor, session_id = %session, count = turns.len()))]
    async fn append_turns(
        &self,
        actor: &ActorId,
        session: &SessionId,
        turns: &[Turn],
    ) -> Result<(), StoreError> {
        let payload = TurnsPayload {
            turns: turns.to_vec(),
        };
        let response = self
            .client
            .post(self.turns_url(actor, session))
            .json(&payload)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StoreError::Rejected {
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ids() -> (ActorId, SessionId) {
        (
            ActorId::from_raw("actor-1"),
            SessionId::from_raw("sess_0000000000000000000000000000"),
        )
    }

    #[tokio::test]
    async fn get_turns_parses_history() {
        let server = MockServer::start().await;
        let (actor, session) = ids();
        let body = serde_json::json!({
            "turns": [
                {"role": "user", "content": "hi", "timestamp": "2026-08-01T00:00:00Z"},
                {"role": "assistant", "content": "hello", "timestamp": "2026-08-01T00:00:01Z"},
            ]
        });
        Mock::given(method("GET"))
            .and(path(format!(
                "/memories/mem-1/actors/{actor}/sessions/{session}/turns"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let store = RemoteSessionStore::new(server.uri(), "mem-1");
        let turns = store.get_turns(&actor, &session).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "hi");
        assert_eq!(turns[1].content, "hello");
    }

    #[tokio::test]
    async fn missing_history_maps_to_empty() {
        let server = MockServer::start().await;
        let (actor, session) = ids();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = RemoteSessionStore::new(server.uri(), "mem-1");
        let turns = store.get_turns(&actor, &session).await.unwrap();
        assert!(turns.is_empty());
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let server = MockServer::start().await;
        let (actor, session) = ids();
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let store = RemoteSessionStore::new(server.uri(), "mem-1");
        match store.get_turns(&actor, &session).await {
            Err(StoreError::Rejected { status: 503 }) => {}
            other => panic!("expected Rejected(503), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn append_posts_ordered_batch() {
        let server = MockServer::start().await;
        let (actor, session) = ids();
        Mock::given(method("POST"))
            .and(path(format!(
                "/memories/mem-1/actors/{actor}/sessions/{session}/turns"
            )))
            .and(body_partial_json(serde_json::json!({
                "turns": [
                    {"role": "user", "content": "ping"},
                    {"role": "assistant", "content": "pong"},
                ]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = RemoteSessionStore::new(server.uri(), "mem-1");
        store
            .append_turns(&actor, &session, &[Turn::user("ping"), Turn::assistant("pong")])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unreachable_store_is_unavailable() {
        let (actor, session) = ids();
        let store = RemoteSessionStore::new("http://127.0.0.1:1", "mem-1");
        match store.get_turns(&actor, &session).await {
            Err(StoreError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {other:?}"),
        }
    }
}
