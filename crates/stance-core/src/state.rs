//! Pipeline state
//!
//! One `PipelineState` is threaded through a run. Stages never touch it
//! directly: each returns a `PartialState` and the orchestrator merges it.
//! Merging sets fields that are still empty and appends to the transcript;
//! overwriting a field another stage produced is an error, so a field has
//! exactly one producer.

use crate::error::StateError;
use crate::phase::{validate_transition, Phase};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stance_agent::{Message, Transcript};
use stance_schema::{Evidence, HandleMap, RawEvidence};
use ulid::Ulid;

/// The record threaded through all stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineState {
    run_id: Ulid,
    subject_name: String,
    stance: String,
    started_at: DateTime<Utc>,
    phase: Phase,
    transcript: Transcript,
    handles: Option<HandleMap>,
    raw_evidence: Option<Vec<RawEvidence>>,
    evidence: Option<Vec<Evidence>>,
}

impl PipelineState {
    /// Fresh state for one run
    #[must_use]
    pub fn new(subject_name: impl Into<String>, stance: impl Into<String>) -> Self {
        Self {
            run_id: Ulid::new(),
            subject_name: subject_name.into(),
            stance: stance.into(),
            started_at: Utc::now(),
            phase: Phase::Start,
            transcript: Transcript::new(),
            handles: None,
            raw_evidence: None,
            evidence: None,
        }
    }

    /// Run identifier
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> Ulid {
        self.run_id
    }

    /// Person under investigation
    #[inline]
    #[must_use]
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// Stance under investigation
    #[inline]
    #[must_use]
    pub fn stance(&self) -> &str {
        &self.stance
    }

    /// Creation time
    #[inline]
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Every message exchanged so far
    #[inline]
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Resolved handles
    #[inline]
    #[must_use]
    pub fn handles(&self) -> Option<&HandleMap> {
        self.handles.as_ref()
    }

    /// Gathered evidence, in gathering order
    #[inline]
    #[must_use]
    pub fn raw_evidence(&self) -> Option<&[RawEvidence]> {
        self.raw_evidence.as_deref()
    }

    /// Scored evidence, in the order the model returned it
    #[inline]
    #[must_use]
    pub fn evidence(&self) -> Option<&[Evidence]> {
        self.evidence.as_deref()
    }

    /// Merge a stage result.
    ///
    /// All-or-nothing: when any field is already set, nothing is applied.
    ///
    /// # Errors
    /// `StateError::FieldAlreadySet` naming the first conflicting field.
    pub fn merge(&mut self, partial: PartialState) -> Result<(), StateError> {
        if partial.handles.is_some() && self.handles.is_some() {
            return Err(StateError::FieldAlreadySet("handles"));
        }
        if partial.raw_evidence.is_some() && self.raw_evidence.is_some() {
            return Err(StateError::FieldAlreadySet("rawEvidence"));
        }
        if partial.evidence.is_some() && self.evidence.is_some() {
            return Err(StateError::FieldAlreadySet("evidence"));
        }

        self.transcript.extend(partial.transcript);
        if let Some(handles) = partial.handles {
            self.handles = Some(handles);
        }
        if let Some(raw) = partial.raw_evidence {
            self.raw_evidence = Some(raw);
        }
        if let Some(evidence) = partial.evidence {
            self.evidence = Some(evidence);
        }
        Ok(())
    }

    /// Move to the next phase
    ///
    /// # Errors
    /// `StateError::IllegalTransition` unless `to` is the single next phase.
    pub fn advance(&mut self, to: Phase) -> Result<(), StateError> {
        validate_transition(self.phase, to)?;
        tracing::debug!(run_id = %self.run_id, from = %self.phase, %to, "Phase transition");
        self.phase = to;
        Ok(())
    }
}

/// Fields produced by one stage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialState {
    /// Messages to append
    pub transcript: Vec<Message>,
    /// Resolved handles
    pub handles: Option<HandleMap>,
    /// Gathered evidence
    pub raw_evidence: Option<Vec<RawEvidence>>,
    /// Scored evidence
    pub evidence: Option<Vec<Evidence>>,
}

impl PartialState {
    /// Empty partial
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With messages to append
    #[must_use]
    pub fn with_transcript(mut self, messages: Vec<Message>) -> Self {
        self.transcript = messages;
        self
    }

    /// With handles
    #[must_use]
    pub fn with_handles(mut self, handles: HandleMap) -> Self {
        self.handles = Some(handles);
        self
    }

    /// With raw evidence
    #[must_use]
    pub fn with_raw_evidence(mut self, raw: Vec<RawEvidence>) -> Self {
        self.raw_evidence = Some(raw);
        self
    }

    /// With scored evidence
    #[must_use]
    pub fn with_evidence(mut self, evidence: Vec<Evidence>) -> Self {
        self.evidence = Some(evidence);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stance_schema::Network;

    fn handles() -> HandleMap {
        HandleMap::new().with(Network::X, "tomio_cz")
    }

    #[test]
    fn new_state_is_empty() {
        let state = PipelineState::new("Tomio Okamura", "pro-western");
        assert_eq!(state.phase(), Phase::Start);
        assert!(state.transcript().is_empty());
        assert!(state.handles().is_none());
        assert!(state.raw_evidence().is_none());
        assert!(state.evidence().is_none());
    }

    #[test]
    fn merge_sets_fields_and_appends_messages() {
        let mut state = PipelineState::new("Tomio Okamura", "pro-western");
        state
            .merge(PartialState::new().with_transcript(vec![Message::user("a")]).with_handles(handles()))
            .unwrap();
        state
            .merge(PartialState::new().with_transcript(vec![Message::user("b")]).with_raw_evidence(Vec::new()))
            .unwrap();

        let contents: Vec<_> = state.transcript().messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["a", "b"]);
        assert_eq!(state.handles(), Some(&handles()));
        assert_eq!(state.raw_evidence(), Some(&[][..]));
    }

    #[test]
    fn produced_fields_are_never_overwritten() {
        let mut state = PipelineState::new("Tomio Okamura", "pro-western");
        state.merge(PartialState::new().with_handles(handles())).unwrap();

        let err = state
            .merge(
                PartialState::new()
                    .with_transcript(vec![Message::user("late")])
                    .with_handles(HandleMap::new()),
            )
            .unwrap_err();

        assert_eq!(err, StateError::FieldAlreadySet("handles"));
        assert_eq!(state.handles(), Some(&handles()));
        assert!(state.transcript().is_empty());
    }

    #[test]
    fn phases_advance_one_step_at_a_time() {
        let mut state = PipelineState::new("x", "y");
        assert!(state.advance(Phase::EvidenceGathered).is_err());
        state.advance(Phase::HandlesResolved).unwrap();
        assert_eq!(state.phase(), Phase::HandlesResolved);
    }

    #[test]
    fn state_round_trips_through_json() {
        let mut state = PipelineState::new("Tomio Okamura", "pro-western");
        state.merge(PartialState::new().with_handles(handles())).unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let back: PipelineState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
