//! Evidence gathering
//!
//! The model sees exactly one scraper per resolved network; networks with
//! no handle have no tool, so the model cannot scrape them.

use super::structured::{no_check, StructuredCall};
use super::{Stage, StageContext};
use crate::error::PipelineError;
use crate::phase::StageKind;
use crate::prompts;
use crate::state::{PartialState, PipelineState};
use stance_agent::{AgentLoop, Toolbox};
use stance_schema::{HandleMap, RawEvidenceList};

const KIND: StageKind = StageKind::GatherEvidence;

/// Collects recent posts from every network with a handle
#[derive(Debug)]
pub struct GatherEvidence {
    ctx: StageContext,
}

impl GatherEvidence {
    /// Create new stage
    #[must_use]
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    fn toolbox(&self, handles: &HandleMap) -> Result<Toolbox, PipelineError> {
        let mut toolbox = Toolbox::new();
        for network in handles.networks() {
            match self.ctx.toolkit.scraper(network) {
                Some(tool) => toolbox
                    .register(tool)
                    .map_err(|e| PipelineError::from_agent(KIND, e))?,
                None => tracing::warn!(%network, "No scraper for network, skipping"),
            }
        }
        Ok(toolbox)
    }
}

#[async_trait::async_trait]
impl Stage for GatherEvidence {
    fn kind(&self) -> StageKind {
        KIND
    }

    async fn run(&self, state: &PipelineState) -> Result<PartialState, PipelineError> {
        let handles = match state.handles() {
            Some(handles) if !handles.is_empty() => handles,
            _ => {
                return Err(PipelineError::MissingData {
                    stage: KIND,
                    field: "handles",
                })
            }
        };
        let config = &self.ctx.config;
        let toolbox = self.toolbox(handles)?;
        if toolbox.is_empty() {
            return Err(PipelineError::MissingData {
                stage: KIND,
                field: "handles",
            });
        }

        let call = StructuredCall::<RawEvidenceList>::new(
            self.ctx.llm.as_ref(),
            KIND,
            config.validation_attempts,
        )?;
        let goal = prompts::evidence_gathering(handles, config.posts_per_network, config.ascii_only);
        let gathered = AgentLoop::new(self.ctx.llm.as_ref(), &toolbox)
            .with_max_turns(config.max_agent_turns)
            .with_label(KIND.as_str())
            .run_for_schema(&goal, call.validator().schema())
            .await
            .map_err(|e| PipelineError::from_agent(KIND, e))?;

        let mut transcript = gathered.transcript;
        let list = call.settle(&mut transcript, gathered.answer, &no_check::<RawEvidenceList>).await?;

        let total = list.evidences.len();
        let raw: Vec<_> = list.evidences.into_iter().filter(|e| e.is_complete()).collect();
        if raw.len() < total {
            tracing::warn!(dropped = total - raw.len(), "Dropped incomplete evidence items");
        }
        tracing::info!(count = raw.len(), turns = gathered.turns, "Evidence gathered");

        Ok(PartialState::new()
            .with_transcript(transcript)
            .with_raw_evidence(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use stance_schema::Network;
    use stance_test_utils::{call, structured, tool_calls, FakeTool, FakeToolkit, ScriptedLlm};
    use stance_tools::{INSTAGRAM_TOOL_NAME, RESOLVER_TOOL_NAME, X_TOOL_NAME};
    use std::sync::Arc;

    fn state_with(handles: HandleMap) -> PipelineState {
        let mut state = PipelineState::new("Tomio Okamura", "pro-western");
        state.merge(PartialState::new().with_handles(handles)).unwrap();
        state
    }

    fn toolkit() -> (FakeToolkit, Arc<FakeTool>, Arc<FakeTool>) {
        let x = FakeTool::ok(X_TOOL_NAME, json!([{"url": "https://x.com/tomio_cz/status/1", "text": "hi", "source": "X/Twitter"}]));
        let ig = FakeTool::ok(INSTAGRAM_TOOL_NAME, json!([]));
        let kit = FakeToolkit::new(FakeTool::ok(RESOLVER_TOOL_NAME, json!([])))
            .with_scraper(Network::X, x.clone())
            .with_scraper(Network::Instagram, ig.clone());
        (kit, x, ig)
    }

    #[tokio::test]
    async fn only_resolved_networks_are_offered() {
        let llm = Arc::new(ScriptedLlm::new([
            tool_calls(vec![call("c1", X_TOOL_NAME, json!({"handle": "tomio_cz"}))]),
            structured(json!({"evidences": [
                {"url": "https://x.com/tomio_cz/status/1", "text": "hi", "source": "X/Twitter"}
            ]})),
        ]));
        let (kit, x, ig) = toolkit();
        let ctx = StageContext::new(llm.clone(), Arc::new(kit), Arc::new(PipelineConfig::default()));

        let partial = GatherEvidence::new(ctx)
            .run(&state_with(HandleMap::new().with(Network::X, "tomio_cz")))
            .await
            .unwrap();

        assert_eq!(x.call_count(), 1);
        assert_eq!(ig.call_count(), 0);
        for request in llm.requests() {
            assert_eq!(request.tools, vec![X_TOOL_NAME.to_string()]);
            assert_eq!(request.output_schema.as_deref(), Some("RawEvidenceList"));
        }
        let raw = partial.raw_evidence.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].source, "X/Twitter");
    }

    #[tokio::test]
    async fn incomplete_items_are_dropped() {
        let llm = ScriptedLlm::new([structured(json!({"evidences": [
            {"url": "https://x.com/tomio_cz/status/1", "text": "hi", "source": "X/Twitter"},
            {"url": "  ", "text": "orphan", "source": "X/Twitter"}
        ]}))]);
        let (kit, _, _) = toolkit();
        let ctx = StageContext::new(Arc::new(llm), Arc::new(kit), Arc::new(PipelineConfig::default()));

        let partial = GatherEvidence::new(ctx)
            .run(&state_with(HandleMap::new().with(Network::X, "tomio_cz")))
            .await
            .unwrap();

        assert_eq!(partial.raw_evidence.map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn missing_handles_fail_before_any_model_call() {
        let llm = Arc::new(ScriptedLlm::new([]));
        let (kit, _, _) = toolkit();
        let ctx = StageContext::new(llm.clone(), Arc::new(kit), Arc::new(PipelineConfig::default()));
        let stage = GatherEvidence::new(ctx);

        let none = stage.run(&PipelineState::new("x", "pro-western")).await.unwrap_err();
        let empty = stage.run(&state_with(HandleMap::new())).await.unwrap_err();

        for err in [none, empty] {
            assert!(matches!(
                err,
                PipelineError::MissingData { stage: StageKind::GatherEvidence, field: "handles" }
            ));
        }
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn malformed_list_is_reprompted_once() {
        let llm = Arc::new(ScriptedLlm::new([
            structured(json!({"items": []})),
            structured(json!({"evidences": []})),
        ]));
        let (kit, _, _) = toolkit();
        let ctx = StageContext::new(llm.clone(), Arc::new(kit), Arc::new(PipelineConfig::default()));

        let partial = GatherEvidence::new(ctx)
            .run(&state_with(HandleMap::new().with(Network::X, "tomio_cz")))
            .await
            .unwrap();

        assert_eq!(llm.requests().len(), 2);
        assert_eq!(partial.raw_evidence, Some(Vec::new()));
        // goal, bad answer, feedback, good answer
        assert_eq!(partial.transcript.len(), 4);
    }
}
