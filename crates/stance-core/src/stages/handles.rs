//! Handle resolution
//!
//! An agent loop searches for the subject's profiles and answers in free
//! text; a second, structured call turns that answer into a handle list.

use super::structured::{no_check, StructuredCall};
use super::{Stage, StageContext};
use crate::error::PipelineError;
use crate::phase::StageKind;
use crate::prompts;
use crate::state::{PartialState, PipelineState};
use stance_agent::{AgentLoop, Message, Toolbox};
use stance_schema::{HandleMap, SocialMediaHandles};

const KIND: StageKind = StageKind::ResolveHandles;

/// Resolves the subject's name to social media handles
#[derive(Debug)]
pub struct ResolveHandles {
    ctx: StageContext,
}

impl ResolveHandles {
    /// Create new stage
    #[must_use]
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

#[async_trait::async_trait]
impl Stage for ResolveHandles {
    fn kind(&self) -> StageKind {
        KIND
    }

    async fn run(&self, state: &PipelineState) -> Result<PartialState, PipelineError> {
        let config = &self.ctx.config;
        let toolbox = Toolbox::from_tools([self.ctx.toolkit.handle_resolver()])
            .map_err(|e| PipelineError::from_agent(KIND, e))?;

        let goal = prompts::handle_resolution(state.subject_name(), &config.networks);
        let search = AgentLoop::new(self.ctx.llm.as_ref(), &toolbox)
            .with_max_turns(config.max_agent_turns)
            .with_label(KIND.as_str())
            .run(&goal)
            .await
            .map_err(|e| PipelineError::from_agent(KIND, e))?;
        tracing::debug!(turns = search.turns, "Handle search finished");

        let mut extraction = vec![Message::user(prompts::handle_extraction(
            &search.answer,
            &config.networks,
        ))];
        let extracted: SocialMediaHandles =
            StructuredCall::new(self.ctx.llm.as_ref(), KIND, config.validation_attempts)?
                .complete(&mut extraction, &no_check::<SocialMediaHandles>)
                .await?;

        let mut handles = HandleMap::new();
        for (network, handle) in HandleMap::from_handles(&extracted).iter() {
            if config.networks.contains(&network) {
                handles = handles.with(network, handle);
            }
        }
        tracing::info!(
            subject = state.subject_name(),
            networks = ?handles.networks().collect::<Vec<_>>(),
            "Handles resolved"
        );

        let mut transcript = search.transcript;
        transcript.append(&mut extraction);
        Ok(PartialState::new()
            .with_transcript(transcript)
            .with_handles(handles))
    }
}
