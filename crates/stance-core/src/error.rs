//! Error types for the pipeline
//!
//! `PipelineError` is the single failure reason a run can end with. Every
//! variant is fatal for the run; `is_retryable` only tells a caller whether
//! starting a fresh run could plausibly succeed.

use crate::phase::{Phase, StageKind};
use stance_agent::{AgentError, ModelError, ToolInvocationError, ValidationError};
use std::path::PathBuf;

/// Reasons a run fails
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The model could not be reached or answered garbage
    #[error(transparent)]
    ModelUnavailable(#[from] ModelError),

    /// A tool failed again after the model saw its first failure
    #[error(transparent)]
    ToolInvocation(#[from] ToolInvocationError),

    /// Model output still invalid after the attempt budget
    #[error("{stage}: output invalid after {attempts} attempt(s): {source}")]
    Validation {
        /// Stage that requested the output
        stage: StageKind,
        /// Attempts made
        attempts: usize,
        /// Last rejection
        #[source]
        source: ValidationError,
    },

    /// Agent loop hit its turn cap
    #[error("{stage}: agent loop did not converge within {max_turns} turns")]
    LoopDidNotConverge {
        /// Stage running the loop
        stage: StageKind,
        /// Configured cap
        max_turns: usize,
    },

    /// Model asked for a tool outside the stage's toolbox
    #[error("{stage}: model requested unknown tool `{name}`")]
    UnknownTool {
        /// Stage running the loop
        stage: StageKind,
        /// Requested name
        name: String,
    },

    /// A field the stage depends on was not produced upstream
    #[error("{stage}: required data `{field}` is missing")]
    MissingData {
        /// Stage that needed the data
        stage: StageKind,
        /// State field
        field: &'static str,
    },

    /// State machine or merge rule violated
    #[error(transparent)]
    State(#[from] StateError),

    /// Invalid configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The run was cancelled before finishing
    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Map an agent loop failure, attributing it to `stage`
    #[must_use]
    pub fn from_agent(stage: StageKind, error: AgentError) -> Self {
        match error {
            AgentError::Model(e) => Self::ModelUnavailable(e),
            AgentError::Tool(e) => Self::ToolInvocation(e),
            AgentError::UnknownTool { name } => Self::UnknownTool { stage, name },
            AgentError::Validation(source) => Self::Validation {
                stage,
                attempts: 1,
                source,
            },
            AgentError::LoopDidNotConverge { max_turns } => {
                Self::LoopDidNotConverge { stage, max_turns }
            }
            AgentError::DuplicateTool(name) => {
                Self::Config(ConfigError::Invalid(format!("tool `{name}` registered twice")))
            }
        }
    }

    /// Short machine-readable tag
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::ToolInvocation(_) => "tool_invocation",
            Self::Validation { .. } => "validation",
            Self::LoopDidNotConverge { .. } => "loop_did_not_converge",
            Self::UnknownTool { .. } => "unknown_tool",
            Self::MissingData { .. } => "missing_data",
            Self::State(_) => "state",
            Self::Config(_) => "config",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether a fresh run could succeed where this one failed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ModelUnavailable(ModelError::Unavailable(_))
                | Self::ToolInvocation(_)
                | Self::Validation { .. }
                | Self::LoopDidNotConverge { .. }
                | Self::UnknownTool { .. }
        )
    }

    /// Stage the failure is attributed to, when known
    #[must_use]
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            Self::Validation { stage, .. }
            | Self::LoopDidNotConverge { stage, .. }
            | Self::UnknownTool { stage, .. }
            | Self::MissingData { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Pipeline state rule violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A stage tried to overwrite a field set by an earlier stage
    #[error("state field `{0}` is already set")]
    FieldAlreadySet(&'static str),

    /// Transition outside the linear phase machine
    #[error("illegal phase transition: {from} -> {to}")]
    IllegalTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
    },
}

/// Configuration loading and validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file unreadable
    #[error("cannot read config {}: {source}", .path.display())]
    Read {
        /// File path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `PipelineConfig`
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Checkpoint write failures, never fatal for a run
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Filesystem error
    #[error("checkpoint I/O at {}: {source}", .path.display())]
    Io {
        /// Target path
        path: PathBuf,
        /// I/O error
        #[source]
        source: std::io::Error,
    },

    /// State could not be encoded or decoded
    #[error("checkpoint encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_errors_keep_their_stage() {
        let err = PipelineError::from_agent(
            StageKind::GatherEvidence,
            AgentError::LoopDidNotConverge { max_turns: 8 },
        );
        assert_eq!(err.kind(), "loop_did_not_converge");
        assert_eq!(err.stage(), Some(StageKind::GatherEvidence));
        assert_eq!(
            err.to_string(),
            "gather_evidence: agent loop did not converge within 8 turns"
        );
    }

    #[test]
    fn retryable_classification() {
        assert!(PipelineError::ModelUnavailable(ModelError::Unavailable("timeout".into())).is_retryable());
        assert!(!PipelineError::ModelUnavailable(ModelError::Config("no key".into())).is_retryable());
        assert!(!PipelineError::Cancelled.is_retryable());
        assert!(!PipelineError::MissingData {
            stage: StageKind::GatherEvidence,
            field: "handles"
        }
        .is_retryable());
    }

    #[test]
    fn tool_errors_pass_through() {
        let err = PipelineError::from_agent(
            StageKind::ResolveHandles,
            AgentError::Tool(ToolInvocationError::new("resolver", "down")),
        );
        assert!(matches!(err, PipelineError::ToolInvocation(ref e) if e.tool_name == "resolver"));
        assert_eq!(err.stage(), None);
    }
}
