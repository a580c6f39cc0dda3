//! Transcript messages
//!
//! The transcript is the audit trail of every model and tool exchange in a
//! run. It only ever grows: there is no API to remove or rewrite a message.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standing instructions
    System,
    /// Prompt written by the pipeline
    User,
    /// Model output
    Assistant,
    /// Result of a tool invocation
    Tool,
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id assigned by the model, echoed back with the result
    pub id: String,
    /// Requested tool name
    pub name: String,
    /// Arguments as decoded from the model's output
    pub arguments: Value,
}

impl ToolCall {
    /// Create new tool call
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One entry of the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Author
    pub role: Role,
    /// Text content (tool results are JSON text)
    pub content: String,
    /// Tool invocations requested in this assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Call this tool message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool that produced this message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Set when the tool invocation failed and `content` is the error
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            tool_name: None,
            is_error: false,
        }
    }

    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Assistant message without tool calls
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant turn requesting tool invocations
    #[must_use]
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Successful tool result for `call`
    #[must_use]
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            tool_name: Some(call.name.clone()),
            ..Self::plain(Role::Tool, content)
        }
    }

    /// Failed tool result for `call`; the error text is what the model sees
    #[must_use]
    pub fn tool_error(call: &ToolCall, error: impl std::fmt::Display) -> Self {
        Self {
            is_error: true,
            ..Self::tool_result(call, format!("ERROR: {error}"))
        }
    }
}

/// Append-only, ordered message log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    /// Create empty transcript
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one message
    #[inline]
    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    /// Append messages in order
    #[inline]
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.0.extend(messages);
    }

    /// Messages in call order
    #[inline]
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    /// Last appended message
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    /// Number of messages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing was exchanged yet
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
