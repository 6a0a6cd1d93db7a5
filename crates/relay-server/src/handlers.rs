use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use relay_core::errors::AuthError;
use relay_core::ids::{ActorId, SessionId};
use relay_core::security::BearerToken;
use relay_engine::EngineError;

use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct InvocationRequest {
    pub prompt: String,
    pub session_id: String,
    pub actor_id: String,
}

#[derive(Debug, Serialize)]
pub struct InvocationResponse {
    pub response: String,
    pub session_id: String,
    pub step_limit_exceeded: bool,
    pub persistence_gap: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

fn error_response(status: StatusCode, error: String, kind: &'static str) -> Response {
    (status, Json(ErrorBody { error, kind })).into_response()
}

fn bearer_from(headers: &HeaderMap) -> Result<BearerToken, AuthError> {
    let value = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?;
    let value = value
        .to_str()
        .map_err(|_| AuthError::Malformed("authorization header is not valid UTF-8".into()))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::Malformed("authorization header is not a bearer token".into()))?;
    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(BearerToken::new(token))
}

fn engine_status(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Auth(_) => StatusCode::UNAUTHORIZED,
        EngineError::InvalidSessionId { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::SessionBusy { .. } => StatusCode::CONFLICT,
        EngineError::Model(_) => StatusCode::BAD_GATEWAY,
    }
}

pub async fn invoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InvocationRequest>,
) -> Response {
    let token = match bearer_from(&headers) {
        Ok(token) => token,
        Err(e) => {
            return error_response(StatusCode::UNAUTHORIZED, e.to_string(), e.error_kind());
        }
    };

    let actor = ActorId::from_raw(request.actor_id);
    let session = SessionId::from_raw(request.session_id.clone());

    // The cycle runs in its own task so a dropped connection doesn't tear it
    // down mid-step: the guard cancels the token, the loop stops before its
    // next step, and the trace still flushes.
    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let coordinator = state.coordinator.clone();
    let task = tokio::spawn(async move {
        coordinator
            .handle_message(&actor, &session, &token, &request.prompt, &cancel)
            .await
    });

    let outcome = match task.await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!(kind = e.error_kind(), error = %e, "cycle failed");
            return error_response(engine_status(&e), e.to_string(), e.error_kind());
        }
        Err(join_err) => {
            warn!(error = %join_err, "cycle task panicked");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".into(),
                "internal",
            );
        }
    };

    Json(InvocationResponse {
        response: outcome.response,
        session_id: request.session_id,
        step_limit_exceeded: outcome.step_limit_exceeded,
        persistence_gap: outcome.persistence_gap,
    })
    .into_response()
}

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc123".parse().unwrap(),
        );
        assert_eq!(bearer_from(&headers).unwrap().expose(), "abc123");
    }

    #[test]
    fn missing_header_is_missing_token() {
        let headers = HeaderMap::new();
        assert!(matches!(bearer_from(&headers), Err(AuthError::MissingToken)));
    }

    #[test]
    fn non_bearer_scheme_is_malformed() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Basic dXNlcjpwYXNz".parse().unwrap(),
        );
        assert!(matches!(bearer_from(&headers), Err(AuthError::Malformed(_))));
    }

    #[test]
    fn empty_bearer_is_missing_token() {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert!(matches!(bearer_from(&headers), Err(AuthError::MissingToken)));
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            engine_status(&EngineError::Auth(AuthError::Expired)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            engine_status(&EngineError::InvalidSessionId { session: "x".into() }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            engine_status(&EngineError::SessionBusy { session: "x".into() }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            engine_status(&EngineError::Model(
                relay_core::model::ModelError::Transport("reset".into())
            )),
            StatusCode::BAD_GATEWAY
        );
    }
}
