//! OpenAI-compatible chat-completions adapter
//!
//! Talks to any endpoint speaking the OpenAI chat-completions protocol.
//! Capability schemas are advertised through the native `tools` field;
//! responses with structured `tool_calls` become ordered tool requests,
//! and free-text responses are additionally scanned for embedded
//! invocation JSON before being treated as a final answer.

use super::{json_object_to_string_map, parse_embedded_invocations, ReasoningEngine, ReasoningError};
use crate::config::ReasoningConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use sdk::{CapabilitySchema, Message, MessageRole, StepOutcome, ToolInvocation};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub struct OpenAiEngine {
    config: ReasoningConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAiEngine {
    pub fn new(config: ReasoningConfig, api_key: SecretString) -> Self {
        Self {
            config,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }
}

#[async_trait]
impl ReasoningEngine for OpenAiEngine {
    fn name(&self) -> &str {
        "openai"
    }

    async fn step(
        &self,
        system_prompt: &str,
        history: &[Message],
        capabilities: &[CapabilitySchema],
    ) -> super::Result<StepOutcome> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let mut payload = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "messages": build_messages(system_prompt, history),
        });
        if !capabilities.is_empty() {
            payload["tools"] = Value::Array(build_tools(capabilities));
        }

        debug!(model = %self.config.model, turns = history.len(), "reasoning step");

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout())
            .header("Authorization", format!("Bearer {}", self.api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout
                } else {
                    ReasoningError::Unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => ReasoningError::AuthenticationFailed(text),
                429 => ReasoningError::RateLimited,
                _ => ReasoningError::Unavailable(format!("{}: {}", status, text)),
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ReasoningError::Parse(e.to_string()))?;

        parse_completion(&data)
    }
}

/// Serialize the system prompt and history into wire messages.
fn build_messages(system_prompt: &str, history: &[Message]) -> Vec<Value> {
    let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
    for msg in history {
        let entry = match msg.role {
            MessageRole::Assistant if msg.tool_calls.is_some() => {
                let calls: Vec<Value> = msg
                    .tool_calls
                    .iter()
                    .flatten()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": {
                                "name": call.capability_name,
                                "arguments": serde_json::to_string(&call.arguments)
                                    .unwrap_or_else(|_| "{}".to_string()),
                            }
                        })
                    })
                    .collect();
                json!({ "role": "assistant", "content": msg.content, "tool_calls": calls })
            }
            MessageRole::Tool => json!({
                "role": "tool",
                "content": msg.content,
                "tool_call_id": msg.tool_call_id,
            }),
            _ => json!({ "role": msg.role, "content": msg.content }),
        };
        messages.push(entry);
    }
    messages
}

/// Render capability schemas as OpenAI function tools with named string
/// parameters.
fn build_tools(capabilities: &[CapabilitySchema]) -> Vec<Value> {
    capabilities
        .iter()
        .map(|cap| {
            let mut properties = serde_json::Map::new();
            let mut required = Vec::new();
            for param in &cap.parameters {
                properties.insert(
                    param.name.clone(),
                    json!({ "type": "string", "description": param.description }),
                );
                if param.required {
                    required.push(Value::String(param.name.clone()));
                }
            }
            json!({
                "type": "function",
                "function": {
                    "name": cap.name,
                    "description": cap.description,
                    "parameters": {
                        "type": "object",
                        "properties": properties,
                        "required": required,
                    }
                }
            })
        })
        .collect()
}

/// Turn a chat-completions response body into a step outcome.
fn parse_completion(data: &Value) -> super::Result<StepOutcome> {
    let message = data
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .ok_or_else(|| ReasoningError::Parse("no message in response".to_string()))?;

    if let Some(calls) = message.get("tool_calls").and_then(|c| c.as_array()) {
        if !calls.is_empty() {
            let invocations: Vec<ToolInvocation> = calls
                .iter()
                .map(|call| {
                    let id = call
                        .get("id")
                        .and_then(|v| v.as_str())
                        .map(String::from)
                        .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4()));
                    let function = call.get("function");
                    let name = function
                        .and_then(|f| f.get("name"))
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let arguments = function
                        .and_then(|f| f.get("arguments"))
                        .and_then(|v| v.as_str())
                        .and_then(|s| serde_json::from_str::<Value>(s).ok())
                        .map(|v| json_object_to_string_map(&v))
                        .unwrap_or_default();
                    ToolInvocation {
                        id,
                        capability_name: name,
                        arguments,
                    }
                })
                .collect();
            return Ok(StepOutcome::ToolRequest(invocations));
        }
    }

    match message.get("content").and_then(|c| c.as_str()) {
        Some(content) => {
            if let Some(invocations) = parse_embedded_invocations(content) {
                return Ok(StepOutcome::ToolRequest(invocations));
            }
            Ok(StepOutcome::Answer(content.to_string()))
        }
        None => Err(ReasoningError::Parse("empty content".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::ParamSpec;
    use std::collections::HashMap;

    fn shell_schema() -> CapabilitySchema {
        CapabilitySchema {
            name: "shell".to_string(),
            description: "Run a shell command".to_string(),
            parameters: vec![ParamSpec {
                name: "command".to_string(),
                description: "The command line to run".to_string(),
                required: true,
            }],
        }
    }

    #[test]
    fn test_build_messages_prepends_system_prompt() {
        let history = vec![Message::user("hi")];
        let messages = build_messages("be brief", &history);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], "be brief");
        assert_eq!(messages[1]["role"], "user");
    }

    #[test]
    fn test_build_messages_renders_tool_exchange() {
        let mut arguments = HashMap::new();
        arguments.insert("command".to_string(), "ls".to_string());
        let call = ToolInvocation {
            id: "call_1".to_string(),
            capability_name: "shell".to_string(),
            arguments,
        };
        let history = vec![
            Message::assistant_with_calls("", vec![call]),
            Message::tool_result(&sdk::ToolResult::success("call_1", "README.md")),
        ];
        let messages = build_messages("sys", &history);

        assert_eq!(messages[1]["tool_calls"][0]["id"], "call_1");
        assert_eq!(
            messages[1]["tool_calls"][0]["function"]["name"],
            "shell"
        );
        assert_eq!(messages[2]["role"], "tool");
        assert_eq!(messages[2]["tool_call_id"], "call_1");
    }

    #[test]
    fn test_build_tools_shape() {
        let tools = build_tools(&[shell_schema()]);
        assert_eq!(tools[0]["type"], "function");
        assert_eq!(tools[0]["function"]["name"], "shell");
        assert_eq!(
            tools[0]["function"]["parameters"]["properties"]["command"]["type"],
            "string"
        );
        assert_eq!(tools[0]["function"]["parameters"]["required"][0], "command");
    }

    #[test]
    fn test_parse_completion_answer() {
        let data = json!({
            "choices": [{ "message": { "content": "all quiet" } }]
        });
        let outcome = parse_completion(&data).expect("parsed");
        assert_eq!(outcome, StepOutcome::Answer("all quiet".to_string()));
    }

    #[test]
    fn test_parse_completion_tool_calls_in_order() {
        let data = json!({
            "choices": [{ "message": {
                "content": null,
                "tool_calls": [
                    { "id": "a", "function": { "name": "shell", "arguments": "{\"command\": \"first\"}" } },
                    { "id": "b", "function": { "name": "shell", "arguments": "{\"command\": \"second\"}" } }
                ]
            } }]
        });
        match parse_completion(&data).expect("parsed") {
            StepOutcome::ToolRequest(calls) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(calls[0].id, "a");
                assert_eq!(calls[0].arg("command"), Some("first"));
                assert_eq!(calls[1].arg("command"), Some("second"));
            }
            other => panic!("expected tool request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_completion_embedded_json_content() {
        let data = json!({
            "choices": [{ "message": {
                "content": "{\"function\": \"shell\", \"arguments\": {\"command\": \"git log\"}}"
            } }]
        });
        match parse_completion(&data).expect("parsed") {
            StepOutcome::ToolRequest(calls) => {
                assert_eq!(calls[0].capability_name, "shell");
            }
            other => panic!("expected tool request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_completion_missing_message_is_error() {
        let data = json!({ "choices": [] });
        assert!(parse_completion(&data).is_err());
    }
}
