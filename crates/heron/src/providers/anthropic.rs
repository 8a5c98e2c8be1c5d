use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Completion, Provider, StopReason, ToolChoice, Usage};
use super::configs::AnthropicProviderConfig;
use crate::models::message::{Message, MessageContent, Role};
use crate::models::tool::{Tool, ToolCall};

const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: i32 = 1024;

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = &data["usage"];

        let input_tokens = usage
            .get("input_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let output_tokens = usage
            .get("output_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    /// Convert internal messages to the messages-endpoint content-block
    /// format. Tool results travel as tool_result blocks inside user turns.
    fn messages_to_anthropic_spec(messages: &[Message]) -> Vec<Value> {
        let mut anthropic_messages = Vec::new();

        for message in messages {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };

            let mut blocks = Vec::new();
            for content in &message.content {
                match content {
                    MessageContent::Text(text) => {
                        if !text.is_empty() {
                            blocks.push(json!({
                                "type": "text",
                                "text": text
                            }));
                        }
                    }
                    MessageContent::ToolRequest(request) => match &request.call {
                        Ok(call) => blocks.push(json!({
                            "type": "tool_use",
                            "id": request.id,
                            "name": call.name,
                            "input": call.arguments
                        })),
                        Err(e) => blocks.push(json!({
                            "type": "text",
                            "text": format!("Error: {}", e)
                        })),
                    },
                    MessageContent::ToolResponse(response) => match &response.output {
                        Ok(payload) => blocks.push(json!({
                            "type": "tool_result",
                            "tool_use_id": response.id,
                            "content": payload
                        })),
                        Err(e) => blocks.push(json!({
                            "type": "tool_result",
                            "tool_use_id": response.id,
                            "content": format!("{}", e),
                            "is_error": true
                        })),
                    },
                }
            }

            if !blocks.is_empty() {
                anthropic_messages.push(json!({
                    "role": role,
                    "content": blocks
                }));
            }
        }

        anthropic_messages
    }

    fn tools_to_anthropic_spec(tools: &[Tool]) -> Vec<Value> {
        tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema
                })
            })
            .collect()
    }

    fn tool_choice_to_anthropic_spec(tool_choice: &ToolChoice) -> Value {
        match tool_choice {
            ToolChoice::Auto => json!({"type": "auto"}),
            ToolChoice::Required => json!({"type": "any"}),
            ToolChoice::Tool(name) => json!({"type": "tool", "name": name}),
            ToolChoice::None => json!(null),
        }
    }

    fn response_to_completion(response: Value) -> Result<Completion> {
        let blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| anyhow!("Invalid response format from Anthropic API"))?;

        let mut content = Vec::new();
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(text) = block.get("text").and_then(|t| t.as_str()) {
                        content.push(MessageContent::text(text));
                    }
                }
                Some("tool_use") => {
                    let id = block["id"].as_str().unwrap_or_default().to_string();
                    let name = block["name"].as_str().unwrap_or_default().to_string();
                    let input = block.get("input").cloned().unwrap_or_else(|| json!({}));
                    content.push(MessageContent::tool_request(
                        id,
                        Ok(ToolCall::new(name, input)),
                    ));
                }
                _ => {}
            }
        }

        let stop_reason = match response.get("stop_reason").and_then(|s| s.as_str()) {
            Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some(other) => StopReason::Other(other.to_string()),
            None => StopReason::Other("missing stop_reason".to_string()),
        };

        let message = Message {
            role: Role::Assistant,
            created: chrono::Utc::now().timestamp(),
            content,
        };

        Ok(Completion {
            message,
            stop_reason,
            usage: Self::get_usage(&response),
        })
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            _ => {
                let status = response.status();
                let error_text = response.text().await?;
                Err(anyhow!("Request failed: {} - {}", status, error_text))
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    #[tracing::instrument(
        name = "anthropic.complete",
        skip(self, system, messages, tools),
        fields(model = %self.config.model, message_count = messages.len(), tool_count = tools.len())
    )]
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
        tool_choice: &ToolChoice,
    ) -> Result<Completion> {
        let anthropic_messages = Self::messages_to_anthropic_spec(messages);

        let mut payload = json!({
            "model": self.config.model,
            "messages": anthropic_messages,
            "max_tokens": self.config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
        });

        if !system.is_empty() {
            payload
                .as_object_mut()
                .unwrap()
                .insert("system".to_string(), json!(system));
        }

        // ToolChoice::None means the model gets no tools at all
        if !tools.is_empty() && *tool_choice != ToolChoice::None {
            payload.as_object_mut().unwrap().insert(
                "tools".to_string(),
                json!(Self::tools_to_anthropic_spec(tools)),
            );
            payload.as_object_mut().unwrap().insert(
                "tool_choice".to_string(),
                Self::tool_choice_to_anthropic_spec(tool_choice),
            );
        }

        if let Some(temp) = self.config.temperature {
            payload
                .as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }

        let response = self.post(payload).await?;

        let completion = Self::response_to_completion(response)?;
        tracing::debug!(stop_reason = ?completion.stop_reason, "completion received");

        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, AnthropicProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test_api_key"))
            .and(header("anthropic-version", ANTHROPIC_API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = AnthropicProviderConfig {
            host: mock_server.uri(),
            api_key: "test_api_key".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            temperature: Some(0.7),
            max_tokens: None,
        };

        let provider = AnthropicProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [{
                "type": "text",
                "text": "Hello! How can I assist you today?"
            }],
            "model": "claude-3-haiku-20240307",
            "stop_reason": "end_turn",
            "stop_sequence": null,
            "usage": {
                "input_tokens": 12,
                "output_tokens": 15
            }
        });

        let (_, provider) = setup_mock_server(response_body).await;

        let messages = vec![Message::user().with_text("Hello?")];

        let completion = provider
            .complete(
                "You are a helpful assistant.",
                &messages,
                &[],
                &ToolChoice::Auto,
            )
            .await?;

        assert_eq!(
            completion.message.text(),
            "Hello! How can I assist you today?"
        );
        assert_eq!(completion.stop_reason, StopReason::EndTurn);
        assert_eq!(completion.usage.input_tokens, Some(12));
        assert_eq!(completion.usage.output_tokens, Some(15));
        assert_eq!(completion.usage.total_tokens, Some(27));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_use() -> Result<()> {
        let response_body = json!({
            "id": "msg_tool",
            "type": "message",
            "role": "assistant",
            "content": [
                {
                    "type": "text",
                    "text": "I'll look that up."
                },
                {
                    "type": "tool_use",
                    "id": "toolu_123",
                    "name": "get_weather",
                    "input": {"location": "Paris"}
                }
            ],
            "model": "claude-3-haiku-20240307",
            "stop_reason": "tool_use",
            "usage": {
                "input_tokens": 30,
                "output_tokens": 20
            }
        });

        let (_, provider) = setup_mock_server(response_body).await;

        let tool = Tool::new(
            "get_weather",
            "Get the current weather in a given location",
            json!({
                "type": "object",
                "properties": {
                    "location": {"type": "string"}
                },
                "required": ["location"]
            }),
        );

        let messages = vec![Message::user().with_text("Weather in Paris?")];

        let completion = provider
            .complete(
                "You are a weather assistant.",
                &messages,
                &[tool],
                &ToolChoice::Required,
            )
            .await?;

        assert_eq!(completion.stop_reason, StopReason::ToolUse);
        let requests = completion.message.tool_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].id, "toolu_123");
        let call = requests[0].call.as_ref().unwrap();
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.arguments, json!({"location": "Paris"}));

        Ok(())
    }

    #[test]
    fn test_messages_to_anthropic_spec_with_tool_round() {
        let messages = vec![
            Message::user().with_text("Weather in Tokyo?"),
            Message::assistant().with_tool_request(
                "toolu_1",
                Ok(ToolCall::new("get_weather", json!({"location": "Tokyo"}))),
            ),
            Message::user().with_tool_response("toolu_1", Ok("{\"temperature\": \"10\"}".to_string())),
        ];

        let spec = AnthropicProvider::messages_to_anthropic_spec(&messages);

        assert_eq!(spec.len(), 3);
        assert_eq!(spec[0]["role"], "user");
        assert_eq!(spec[0]["content"][0]["type"], "text");
        assert_eq!(spec[1]["role"], "assistant");
        assert_eq!(spec[1]["content"][0]["type"], "tool_use");
        assert_eq!(spec[1]["content"][0]["name"], "get_weather");
        assert_eq!(spec[2]["role"], "user");
        assert_eq!(spec[2]["content"][0]["type"], "tool_result");
        assert_eq!(spec[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(spec[2]["content"][0]["content"], "{\"temperature\": \"10\"}");
    }

    #[test]
    fn test_tool_choice_to_anthropic_spec() {
        assert_eq!(
            AnthropicProvider::tool_choice_to_anthropic_spec(&ToolChoice::Auto),
            json!({"type": "auto"})
        );
        assert_eq!(
            AnthropicProvider::tool_choice_to_anthropic_spec(&ToolChoice::Required),
            json!({"type": "any"})
        );
        assert_eq!(
            AnthropicProvider::tool_choice_to_anthropic_spec(&ToolChoice::Tool(
                "weather_report".to_string()
            )),
            json!({"type": "tool", "name": "weather_report"})
        );
    }

    #[test]
    fn test_response_to_completion_max_tokens() {
        let response = json!({
            "content": [{"type": "text", "text": "truncat"}],
            "stop_reason": "max_tokens",
            "usage": {"input_tokens": 5, "output_tokens": 1024}
        });

        let completion = AnthropicProvider::response_to_completion(response).unwrap();
        assert_eq!(completion.stop_reason, StopReason::MaxTokens);
    }
}
