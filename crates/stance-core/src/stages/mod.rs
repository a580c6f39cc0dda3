//! The three pipeline stages
//!
//! A stage reads the state and returns the fields it produces; it never
//! mutates the state itself. Stages share a `StageContext` holding the
//! model, the toolkit and the configuration.

mod gather;
mod handles;
mod scoring;
mod structured;

pub use gather::GatherEvidence;
pub use handles::ResolveHandles;
pub use scoring::ScoreEvidence;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::phase::StageKind;
use crate::state::{PartialState, PipelineState};
use stance_agent::LlmClient;
use stance_tools::Toolkit;
use std::sync::Arc;

/// One step of the pipeline
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    /// Which stage this is
    fn kind(&self) -> StageKind;

    /// Compute this stage's fields from the state so far
    ///
    /// # Errors
    /// Any `PipelineError`; the orchestrator aborts the run on failure.
    async fn run(&self, state: &PipelineState) -> Result<PartialState, PipelineError>;
}

/// Collaborators shared by all stages
#[derive(Clone)]
pub struct StageContext {
    /// Language model
    pub llm: Arc<dyn LlmClient>,
    /// Tool source
    pub toolkit: Arc<dyn Toolkit>,
    /// Run configuration
    pub config: Arc<PipelineConfig>,
}

impl StageContext {
    /// Create new context
    #[must_use]
    pub fn new(llm: Arc<dyn LlmClient>, toolkit: Arc<dyn Toolkit>, config: Arc<PipelineConfig>) -> Self {
        Self {
            llm,
            toolkit,
            config,
        }
    }
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("model", &self.llm.model())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// The stages in execution order
#[must_use]
pub fn default_stages(ctx: &StageContext) -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ResolveHandles::new(ctx.clone())),
        Box::new(GatherEvidence::new(ctx.clone())),
        Box::new(ScoreEvidence::new(ctx.clone())),
    ]
}
