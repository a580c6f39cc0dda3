//! Stance Core - stance investigation pipeline
//!
//! Three stages run over one shared state:
//! 1. `ResolveHandles`: person name to social media handles
//! 2. `GatherEvidence`: handles to recent posts
//! 3. `ScoreEvidence`: posts to stance and relevance scores
//!
//! The `Pipeline` orchestrator merges each stage result, advances the phase
//! machine and finally aggregates the scores into one number in [-1, 1].
//!
//! # Example
//!
//! ```rust,ignore
//! use stance_core::{Pipeline, PipelineConfig};
//!
//! # async fn example(llm: Arc<dyn LlmClient>, toolkit: Arc<dyn Toolkit>) -> Result<(), PipelineError> {
//! let run = Pipeline::new(llm, toolkit, PipelineConfig::default())
//!     .run("Tomio Okamura")
//!     .await?;
//! println!("{} scored {:.2}", run.report.subject, run.report.score);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod aggregate;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod phase;
pub mod prompts;
pub mod stages;
pub mod state;

pub use aggregate::{aggregate, presentation_order, StanceReport};
pub use checkpoint::{CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use config::{
    CacheConfig, CheckpointConfig, ModelConfig, PipelineConfig, DEFAULT_STANCE,
    DEFAULT_VALIDATION_ATTEMPTS,
};
pub use error::{CheckpointError, ConfigError, PipelineError, StateError};
pub use orchestrator::{Pipeline, PipelineRun};
pub use phase::{allowed_transitions, validate_transition, Phase, StageKind};
pub use stages::{default_stages, GatherEvidence, ResolveHandles, ScoreEvidence, Stage, StageContext};
pub use state::{PartialState, PipelineState};
