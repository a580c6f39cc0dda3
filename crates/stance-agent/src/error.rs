//! Error types for the agent layer
//!
//! - `ModelError`: the model could not be reached or answered garbage
//! - `ToolInvocationError`: a named tool produced no usable data
//! - `ValidationError`: model output does not match the requested schema
//! - `AgentError`: everything that ends an agent loop

/// Model transport and protocol failures
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Transport failure, the model could not be reached
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// The endpoint answered with a non-success status
    #[error("model request rejected ({status}): {body}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// The response could not be understood
    #[error("malformed model response: {0}")]
    Malformed(String),

    /// Client misconfiguration (missing key, bad URL)
    #[error("model client configuration: {0}")]
    Config(String),
}

/// A named external tool could not produce data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tool `{tool_name}` failed: {cause}")]
pub struct ToolInvocationError {
    /// Tool that failed
    pub tool_name: String,
    /// Human-readable cause, shown to the model
    pub cause: String,
}

impl ToolInvocationError {
    /// Create new tool error
    #[inline]
    #[must_use]
    pub fn new(tool_name: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            cause: cause.into(),
        }
    }
}

/// Model output rejected against a target schema.
///
/// The `Display` text is written for the model: it is appended verbatim when
/// a stage re-prompts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Output is not parseable JSON
    #[error("output is not valid JSON: {0}")]
    Syntax(String),

    /// JSON parsed but violates the schema
    #[error("output does not match schema `{schema}`: {}", .violations.join("; "))]
    Schema {
        /// Schema name
        schema: String,
        /// One entry per violation, prefixed with the JSON pointer
        violations: Vec<String>,
    },

    /// Schema-valid JSON that still failed to decode
    #[error("output could not be decoded as `{schema}`: {detail}")]
    Decode {
        /// Schema name
        schema: String,
        /// Decoder message
        detail: String,
    },

    /// The model asked for tools where none were offered
    #[error("expected a final answer but the model requested tools: {}", .0.join(", "))]
    UnexpectedToolCall(Vec<String>),

    /// Well-formed output inconsistent with the request
    #[error("{0}")]
    Inconsistent(String),

    /// The target schema itself does not compile
    #[error("invalid target schema `{schema}`: {detail}")]
    InvalidSchema {
        /// Schema name
        schema: String,
        /// Compiler message
        detail: String,
    },
}

impl ValidationError {
    /// Output could not even be parsed (as opposed to parsed-but-invalid)
    #[inline]
    #[must_use]
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }
}

/// Errors that terminate an agent loop
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Model call failed
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Model requested a tool outside the toolbox
    #[error("model requested unknown tool `{name}`")]
    UnknownTool {
        /// Requested name
        name: String,
    },

    /// Two tools registered under one name
    #[error("tool `{0}` registered twice")]
    DuplicateTool(String),

    /// Same tool failed again after the model was shown the first failure
    #[error(transparent)]
    Tool(#[from] ToolInvocationError),

    /// Terminal answer did not match the target schema
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Turn cap reached without a terminal answer
    #[error("agent loop did not converge within {max_turns} turns")]
    LoopDidNotConverge {
        /// Configured cap
        max_turns: usize,
    },
}
