//! Evidence scoring
//!
//! One structured call scores every gathered post. The answer must cover
//! each post exactly once: same count, same URLs. Only the scores are taken
//! from the answer; url, text and source always come from the gathered post.

use super::structured::StructuredCall;
use super::{Stage, StageContext};
use crate::error::PipelineError;
use crate::phase::StageKind;
use crate::prompts;
use crate::state::{PartialState, PipelineState};
use stance_agent::{Message, ValidationError};
use stance_schema::{Evidence, EvidenceList, RawEvidence};

const KIND: StageKind = StageKind::ScoreEvidence;

/// Scores gathered evidence against the stance
#[derive(Debug)]
pub struct ScoreEvidence {
    ctx: StageContext,
}

impl ScoreEvidence {
    /// Create new stage
    #[must_use]
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }
}

/// Reject answers that drop, invent or duplicate posts
fn check_coverage(raw: &[RawEvidence], scored: &EvidenceList) -> Result<(), ValidationError> {
    if scored.evidences.len() != raw.len() {
        return Err(ValidationError::Inconsistent(format!(
            "expected {} scored items, got {}",
            raw.len(),
            scored.evidences.len()
        )));
    }

    let mut expected: Vec<&str> = raw.iter().map(|r| r.url.as_str()).collect();
    let mut got: Vec<&str> = scored.evidences.iter().map(|e| e.url.as_str()).collect();
    expected.sort_unstable();
    got.sort_unstable();
    if expected != got {
        let unknown: Vec<&str> = got.iter().filter(|u| !expected.contains(u)).copied().collect();
        return Err(ValidationError::Inconsistent(format!(
            "scored items do not match the evidence urls (unexpected: {unknown:?})"
        )));
    }
    Ok(())
}

/// Pair each gathered post with its scores, in gathering order
///
/// Expects a list that passed `check_coverage`.
fn attach_scores(raw: &[RawEvidence], mut pending: Vec<Evidence>) -> Vec<Evidence> {
    raw.iter()
        .filter_map(|post| {
            let at = pending.iter().position(|e| e.url == post.url)?;
            let answer = pending.swap_remove(at);
            if answer.text != post.text || answer.source != post.source {
                tracing::debug!(url = %post.url, "Model rewrote a post; keeping the gathered text");
            }
            Some(Evidence::from_raw(post.clone(), answer.score, answer.relevance))
        })
        .collect()
}

#[async_trait::async_trait]
impl Stage for ScoreEvidence {
    fn kind(&self) -> StageKind {
        KIND
    }

    async fn run(&self, state: &PipelineState) -> Result<PartialState, PipelineError> {
        let raw = state.raw_evidence().ok_or(PipelineError::MissingData {
            stage: KIND,
            field: "rawEvidence",
        })?;
        if raw.is_empty() {
            tracing::info!("No evidence to score");
            return Ok(PartialState::new().with_evidence(Vec::new()));
        }

        let config = &self.ctx.config;
        let mut messages = vec![Message::user(prompts::scoring(
            state.stance(),
            &config.stance_factors,
            raw,
        ))];
        let check = |list: &EvidenceList| check_coverage(raw, list);
        let scored = StructuredCall::<EvidenceList>::new(
            self.ctx.llm.as_ref(),
            KIND,
            config.validation_attempts,
        )?
        .complete(&mut messages, &check)
        .await?;

        let evidence = attach_scores(raw, scored.evidences);
        tracing::info!(count = evidence.len(), "Evidence scored");
        Ok(PartialState::new()
            .with_transcript(messages)
            .with_evidence(evidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use stance_test_utils::{raw_posts, structured, FakeTool, FakeToolkit, ScriptedLlm};
    use stance_tools::RESOLVER_TOOL_NAME;
    use std::sync::Arc;

    fn stage(llm: &Arc<ScriptedLlm>, attempts: usize) -> ScoreEvidence {
        let toolkit = FakeToolkit::new(FakeTool::ok(RESOLVER_TOOL_NAME, json!([])));
        let config = PipelineConfig::default().with_validation_attempts(attempts);
        ScoreEvidence::new(StageContext::new(llm.clone(), Arc::new(toolkit), Arc::new(config)))
    }

    fn state_with(raw: Vec<RawEvidence>) -> PipelineState {
        let mut state = PipelineState::new("Tomio Okamura", "pro-western");
        state.merge(PartialState::new().with_raw_evidence(raw)).unwrap();
        state
    }

    fn answer(raw: &[RawEvidence], score: f64) -> Value {
        let items: Vec<_> = raw
            .iter()
            .map(|r| json!({"url": r.url, "text": r.text, "source": r.source, "score": score, "relevance": 0.5}))
            .collect();
        json!({ "evidences": items })
    }

    #[tokio::test]
    async fn every_item_is_scored() {
        let raw = raw_posts(3);
        let llm = Arc::new(ScriptedLlm::new([structured(answer(&raw, 0.4))]));

        let partial = stage(&llm, 2).run(&state_with(raw.clone())).await.unwrap();

        let evidence = partial.evidence.unwrap();
        assert_eq!(evidence.len(), 3);
        assert!(evidence.iter().all(|e| e.score == 0.4 && e.is_within_bounds()));
        assert_eq!(partial.transcript.len(), 2);
        assert_eq!(llm.requests()[0].output_schema.as_deref(), Some("EvidenceList"));
    }

    #[tokio::test]
    async fn empty_evidence_skips_the_model() {
        let llm = Arc::new(ScriptedLlm::new([]));

        let partial = stage(&llm, 2).run(&state_with(Vec::new())).await.unwrap();

        assert_eq!(partial.evidence, Some(Vec::new()));
        assert!(llm.requests().is_empty());
    }

    #[tokio::test]
    async fn missing_raw_evidence_is_an_error() {
        let llm = Arc::new(ScriptedLlm::new([]));
        let state = PipelineState::new("Tomio Okamura", "pro-western");

        let err = stage(&llm, 2).run(&state).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::MissingData { stage: StageKind::ScoreEvidence, field: "rawEvidence" }
        ));
    }

    #[tokio::test]
    async fn out_of_range_score_is_reprompted() {
        let raw = raw_posts(2);
        let llm = Arc::new(ScriptedLlm::new([
            structured(answer(&raw, 1.5)),
            structured(answer(&raw, -0.2)),
        ]));

        let partial = stage(&llm, 2).run(&state_with(raw)).await.unwrap();

        assert_eq!(llm.requests().len(), 2);
        assert!(partial.evidence.unwrap().iter().all(|e| e.score == -0.2));
        // prompt, rejected answer, feedback, accepted answer
        assert_eq!(partial.transcript.len(), 4);
    }

    #[tokio::test]
    async fn dropped_items_exhaust_the_budget() {
        let raw = raw_posts(3);
        let short = answer(&raw[..2], 0.1);
        let llm = Arc::new(ScriptedLlm::new([structured(short.clone()), structured(short)]));

        let err = stage(&llm, 2).run(&state_with(raw)).await.unwrap_err();

        match err {
            PipelineError::Validation { stage, attempts, source } => {
                assert_eq!(stage, StageKind::ScoreEvidence);
                assert_eq!(attempts, 2);
                assert!(matches!(source, ValidationError::Inconsistent(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn rewritten_text_and_source_are_ignored() {
        let raw = raw_posts(2);
        let mut forged = answer(&raw, 0.3);
        forged["evidences"][0]["text"] = json!("INVENTED QUOTE");
        forged["evidences"][0]["source"] = json!("Instagram");
        forged["evidences"].as_array_mut().unwrap().reverse();
        let llm = Arc::new(ScriptedLlm::new([structured(forged)]));

        let partial = stage(&llm, 2).run(&state_with(raw.clone())).await.unwrap();

        let evidence = partial.evidence.unwrap();
        let kept: Vec<RawEvidence> = evidence.iter().map(Evidence::raw).collect();
        assert_eq!(kept, raw);
        assert!(evidence.iter().all(|e| e.score == 0.3 && e.relevance == 0.5));
        assert_eq!(llm.requests().len(), 1);
    }

    #[test]
    fn coverage_ignores_order_but_not_duplicates() {
        let raw = raw_posts(2);
        let mut reversed = answer(&raw, 0.0);
        reversed["evidences"].as_array_mut().unwrap().reverse();
        let reversed: EvidenceList = serde_json::from_value(reversed).unwrap();
        assert!(check_coverage(&raw, &reversed).is_ok());

        let twice = vec![raw[0].clone(), raw[0].clone()];
        let doubled: EvidenceList = serde_json::from_value(answer(&twice, 0.0)).unwrap();
        assert!(check_coverage(&raw, &doubled).is_err());
    }
}
