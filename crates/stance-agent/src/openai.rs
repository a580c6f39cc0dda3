//! OpenAI chat-completions adapter
//!
//! Maps the transcript to chat messages, toolbox specs to function tools and
//! the output schema to `response_format: json_schema`.

use crate::error::ModelError;
use crate::llm::{Completion, CompletionRequest, LlmClient};
use crate::message::{Message, Role, ToolCall};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Response bodies longer than this are cut in error messages
const MAX_ERROR_BODY: usize = 500;

/// Connection settings for the OpenAI client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Model name, e.g. "gpt-4o"
    pub model: String,
    /// API root
    pub base_url: String,
    /// Sampling temperature, provider default when `None`
    pub temperature: Option<f32>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Settings for `model` against the public API
    #[inline]
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: None,
            timeout_secs: 120,
        }
    }
}

/// `LlmClient` backed by the chat-completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create client
    ///
    /// # Errors
    /// `ModelError::Config` for an empty key or an unbuildable HTTP client.
    pub fn new(api_key: impl Into<String>, config: OpenAiConfig) -> Result<Self, ModelError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ModelError::Config("empty API key".to_string()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::Config(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            config,
        })
    }

    /// Create client with the key from `OPENAI_API_KEY`
    ///
    /// # Errors
    /// `ModelError::Config` when the variable is unset.
    pub fn from_env(config: OpenAiConfig) -> Result<Self, ModelError> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ModelError::Config("OPENAI_API_KEY is not set".to_string()))?;
        Self::new(key, config)
    }

    /// Request body for one completion
    #[must_use]
    pub fn request_body(&self, request: &CompletionRequest<'_>) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": request.messages.iter().map(message_json).collect::<Vec<_>>(),
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = json!(temperature);
        }
        if !request.tools.is_empty() {
            body["tools"] = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
        }
        if let Some(schema) = request.output_schema {
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                    "strict": false,
                }
            });
        }
        body
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError> {
        let body = self.request_body(&request);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ModelError::Rejected {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ModelError::Malformed(e.to_string()))?;
        parse_completion(&raw, request.output_schema.is_some())
    }
}

fn message_json(message: &Message) -> Value {
    match message.role {
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content,
        }),
        Role::Assistant if !message.tool_calls.is_empty() => {
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                json!(message.content)
            };
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string(),
                        }
                    })
                })
                .collect();
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        role => json!({ "role": role, "content": message.content }),
    }
}

/// Decode a chat-completions response body
///
/// # Errors
/// `ModelError::Malformed` when the body has no usable first choice.
pub fn parse_completion(raw: &Value, structured: bool) -> Result<Completion, ModelError> {
    let message = raw
        .pointer("/choices/0/message")
        .ok_or_else(|| ModelError::Malformed("response has no choices".to_string()))?;
    let content = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        if !calls.is_empty() {
            let calls = calls.iter().map(tool_call).collect::<Result<Vec<_>, _>>()?;
            return Ok(Completion::ToolCalls { content, calls });
        }
    }

    if structured {
        if let Ok(value) = serde_json::from_str::<Value>(&content) {
            if value.is_object() || value.is_array() {
                return Ok(Completion::Structured(value));
            }
        }
    }
    Ok(Completion::Text(content))
}

fn tool_call(raw: &Value) -> Result<ToolCall, ModelError> {
    let id = raw.get("id").and_then(Value::as_str).unwrap_or_default();
    let name = raw
        .pointer("/function/name")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::Malformed("tool call without function name".to_string()))?;
    let arguments = raw
        .pointer("/function/arguments")
        .and_then(Value::as_str)
        .unwrap_or("{}");
    // Undecodable arguments are passed through so the tool reports them back.
    let arguments = serde_json::from_str(arguments).unwrap_or_else(|_| json!(arguments));
    Ok(ToolCall::new(id, name, arguments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::OutputSchema;
    use crate::tool::ToolSpec;

    fn client() -> OpenAiClient {
        OpenAiClient::new("sk-test", OpenAiConfig::new("gpt-4o")).unwrap()
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            OpenAiClient::new(" ", OpenAiConfig::default()),
            Err(ModelError::Config(_))
        ));
    }

    #[test]
    fn body_carries_tools_and_schema() {
        let call = ToolCall::new("c1", "scrape_x_posts", json!({"handle": "a"}));
        let messages = vec![
            Message::user("goal"),
            Message::assistant_tool_calls("", vec![call.clone()]),
            Message::tool_result(&call, "[]"),
        ];
        let tools = vec![ToolSpec {
            name: "scrape_x_posts".into(),
            description: "Scrape X".into(),
            parameters: json!({"type": "object"}),
            output: json!({}),
        }];
        let schema = OutputSchema {
            name: "RawEvidenceList".into(),
            schema: json!({"type": "object"}),
        };
        let request = CompletionRequest::new(&messages)
            .with_tools(&tools)
            .with_output_schema(Some(&schema));

        let body = client().request_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][1]["content"], Value::Null);
        assert_eq!(body["messages"][1]["tool_calls"][0]["function"]["arguments"], "{\"handle\":\"a\"}");
        assert_eq!(body["messages"][2]["tool_call_id"], "c1");
        assert_eq!(body["tools"][0]["function"]["name"], "scrape_x_posts");
        assert_eq!(body["response_format"]["json_schema"]["name"], "RawEvidenceList");
    }

    #[test]
    fn parses_tool_calls() {
        let raw = json!({"choices": [{"message": {"content": null, "tool_calls": [
            {"id": "c1", "type": "function", "function": {"name": "resolve", "arguments": "{\"name\":\"Tomio\"}"}}
        ]}}]});
        let completion = parse_completion(&raw, false).unwrap();
        assert_eq!(
            completion,
            Completion::ToolCalls {
                content: String::new(),
                calls: vec![ToolCall::new("c1", "resolve", json!({"name": "Tomio"}))],
            }
        );
    }

    #[test]
    fn structured_content_is_decoded_only_when_requested() {
        let raw = json!({"choices": [{"message": {"content": "{\"evidences\": []}"}}]});
        assert_eq!(
            parse_completion(&raw, true).unwrap(),
            Completion::Structured(json!({"evidences": []}))
        );
        assert_eq!(
            parse_completion(&raw, false).unwrap(),
            Completion::Text("{\"evidences\": []}".into())
        );
    }

    #[test]
    fn missing_choices_is_malformed() {
        assert!(matches!(
            parse_completion(&json!({"error": "x"}), false),
            Err(ModelError::Malformed(_))
        ));
    }
}
