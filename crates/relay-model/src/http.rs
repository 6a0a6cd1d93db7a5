use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use relay_core::ids::ToolCallId;
use relay_core::model::{ModelClient, ModelError, ModelOutput};
use relay_core::tools::{ToolCall, ToolDescriptor};
use relay_core::turns::{Turn, TurnRole};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ToolSpec<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionSpec<'a>,
}

#[derive(Serialize)]
struct FunctionSpec<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded string per the chat-completions convention.
    arguments: String,
}

/// Chat-completions client for the hosted model endpoint.
pub struct HttpModelClient {
    client: reqwest::Client,
    url: String,
    model_id: String,
}

impl HttpModelClient {
    pub fn new(url: impl Into<String>, model_id: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
            model_id: model_id.into(),
        }
    }

    fn role_name(role: TurnRole) -> &'static str {
        match role {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::Tool => "tool",
        }
    }

    fn build_request<'a>(
        &'a self,
        history: &'a [Turn],
        tools: &'a [ToolDescriptor],
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model_id,
            messages: history
                .iter()
                .map(|t| ChatMessage {
                    role: Self::role_name(t.role),
                    content: &t.content,
                })
                .collect(),
            tools: tools
                .iter()
                .map(|t| ToolSpec {
                    kind: "function",
                    function: FunctionSpec {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.parameters_schema,
                    },
                })
                .collect(),
        }
    }

    fn parse_output(response: ChatResponse) -> Result<ModelOutput, ModelError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::MalformedOutput("response had no choices".into()))?;

        let tool_call = match choice.message.tool_calls.into_iter().next() {
            Some(wire) => {
                let parameters: serde_json::Value = serde_json::from_str(&wire.function.arguments)
                    .map_err(|e| {
                        ModelError::MalformedOutput(format!("tool arguments not valid JSON: {e}"))
                    })?;
                Some(ToolCall {
                    id: wire
                        .id
                        .map(ToolCallId::from_raw)
                        .unwrap_or_default(),
                    name: wire.function.name,
                    parameters,
                })
            }
            None => None,
        };

        Ok(ModelOutput {
            text: choice.message.content,
            tool_call,
        })
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    #[instrument(skip(self, history, tools), fields(model_id = %self.model_id, turns = history.len()))]
    async fn complete(
        &self,
        history: &[Turn],
        tools: &[ToolDescriptor],
    ) -> Result<ModelOutput, ModelError> {
        let body = self.build_request(history, tools);
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ModelError::AuthenticationFailed(format!(
                "model endpoint returned status {}",
                status.as_u16()
            )));
        }
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ModelError::InvalidRequest(format!(
                "status {}: {detail}",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(ModelError::Transport(format!(
                "model endpoint returned status {}",
                status.as_u16()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedOutput(e.to_string()))?;
        Self::parse_output(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::model::StepDecision;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn descriptor() -> ToolDescriptor {
        ToolDescriptor {
            name: "web_search".into(),
            description: "Search the web".into(),
            parameters_schema: json!({"type": "object"}),
        }
    }

    #[tokio::test]
    async fn text_answer_parses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_partial_json(json!({
                "model": "relay-test",
                "messages": [{"role": "user", "content": "ping"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "pong"}}],
            })))
            .mount(&server)
            .await;

        let client = HttpModelClient::new(server.uri(), "relay-test");
        let output = client.complete(&[Turn::user("ping")], &[]).await.unwrap();
        match output.resolve() {
            StepDecision::Answer(text) => assert_eq!(text, "pong"),
            other => panic!("expected Answer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_call_arguments_decode_from_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "content": "let me check",
                    "tool_calls": [{
                        "id": "call_abc",
                        "function": {"name": "web_search", "arguments": "{\"query\":\"rust\"}"},
                    }],
                }}],
            })))
            .mount(&server)
            .await;

        let client = HttpModelClient::new(server.uri(), "relay-test");
        let output = client
            .complete(&[Turn::user("search rust")], &[descriptor()])
            .await
            .unwrap();
        let call = output.tool_call.expect("tool call expected");
        assert_eq!(call.name, "web_search");
        assert_eq!(call.parameters["query"], "rust");
        assert_eq!(call.id.as_str(), "call_abc");
    }

    #[tokio::test]
    async fn malformed_arguments_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {
                    "tool_calls": [{
                        "function": {"name": "web_search", "arguments": "not json"},
                    }],
                }}],
            })))
            .mount(&server)
            .await;

        let client = HttpModelClient::new(server.uri(), "relay-test");
        let err = client.complete(&[Turn::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, ModelError::MalformedOutput(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn auth_rejection_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HttpModelClient::new(server.uri(), "relay-test");
        let err = client.complete(&[Turn::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, ModelError::AuthenticationFailed(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn server_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpModelClient::new(server.uri(), "relay-test");
        let err = client.complete(&[Turn::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn tool_turns_are_sent_with_tool_role() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "user", "content": "what time is it"},
                    {"role": "tool", "content": "{\"time\":\"12:00\"}"},
                ],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "noon"}}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpModelClient::new(server.uri(), "relay-test");
        let history = vec![
            Turn::user("what time is it"),
            Turn::tool("{\"time\":\"12:00\"}"),
        ];
        client.complete(&history, &[]).await.unwrap();
    }
}
