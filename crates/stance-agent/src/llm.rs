//! The model seam
//!
//! Everything non-deterministic in the pipeline goes through `LlmClient`.
//! Stages and the agent loop only see this trait, so tests swap in a
//! scripted client.

use crate::error::ModelError;
use crate::message::{Message, ToolCall};
use crate::schema::OutputSchema;
use crate::tool::ToolSpec;
use serde_json::Value;

/// One completion request
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// Conversation so far, goal first
    pub messages: &'a [Message],
    /// Tools the model may call
    pub tools: &'a [ToolSpec],
    /// Shape the final answer must take, if any
    pub output_schema: Option<&'a OutputSchema>,
}

impl<'a> CompletionRequest<'a> {
    /// Plain request without tools or schema
    #[inline]
    #[must_use]
    pub fn new(messages: &'a [Message]) -> Self {
        Self {
            messages,
            tools: &[],
            output_schema: None,
        }
    }

    /// With callable tools
    #[inline]
    #[must_use]
    pub fn with_tools(mut self, tools: &'a [ToolSpec]) -> Self {
        self.tools = tools;
        self
    }

    /// With a target schema for the final answer
    #[inline]
    #[must_use]
    pub fn with_output_schema(mut self, schema: Option<&'a OutputSchema>) -> Self {
        self.output_schema = schema;
        self
    }
}

/// What the model answered
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Free-form final answer
    Text(String),
    /// Request to run tools, in order
    ToolCalls {
        /// Text that accompanied the calls, often empty
        content: String,
        /// Requested invocations
        calls: Vec<ToolCall>,
    },
    /// Final answer decoded as JSON under the requested schema
    Structured(Value),
}

impl Completion {
    /// Transcript entry for this model turn
    #[must_use]
    pub fn to_message(&self) -> Message {
        match self {
            Completion::Text(text) => Message::assistant(text.clone()),
            Completion::ToolCalls { content, calls } => {
                Message::assistant_tool_calls(content.clone(), calls.clone())
            }
            Completion::Structured(value) => Message::assistant(value.to_string()),
        }
    }

    /// Names of requested tools, empty for final answers
    #[must_use]
    pub fn requested_tools(&self) -> Vec<String> {
        match self {
            Completion::ToolCalls { calls, .. } => calls.iter().map(|c| c.name.clone()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Language model capability
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier, for logs
    fn model(&self) -> &str;

    /// Run one completion
    ///
    /// # Errors
    /// `ModelError` on transport or protocol failure. Callers treat it as fatal.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError>;
}
