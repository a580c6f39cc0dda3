//! Pipeline phases and stage names
//!
//! The run is a fixed linear state machine with exactly one outgoing edge per
//! phase: `Start → HandlesResolved → EvidenceGathered → Scored → Done`.

use crate::error::StateError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Created, nothing resolved yet
    Start,
    /// Handle resolution finished
    HandlesResolved,
    /// Evidence gathering finished
    EvidenceGathered,
    /// Scoring finished
    Scored,
    /// Aggregated, terminal
    Done,
}

impl Phase {
    /// The only phase reachable from this one
    #[must_use]
    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Start => Some(Phase::HandlesResolved),
            Phase::HandlesResolved => Some(Phase::EvidenceGathered),
            Phase::EvidenceGathered => Some(Phase::Scored),
            Phase::Scored => Some(Phase::Done),
            Phase::Done => None,
        }
    }

    /// Whether the run is over
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self == Phase::Done
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Start => "start",
            Phase::HandlesResolved => "handles_resolved",
            Phase::EvidenceGathered => "evidence_gathered",
            Phase::Scored => "scored",
            Phase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Phases reachable from `from`
#[must_use]
pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    from.next().into_iter().collect()
}

/// Check a transition against the linear machine
///
/// # Errors
/// `StateError::IllegalTransition` for anything but the single forward edge.
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), StateError> {
    if from.next() == Some(to) {
        Ok(())
    } else {
        Err(StateError::IllegalTransition { from, to })
    }
}

/// The three pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Name → handles
    ResolveHandles,
    /// Handles → raw evidence
    GatherEvidence,
    /// Raw → scored evidence
    ScoreEvidence,
}

impl StageKind {
    /// Stages in execution order
    pub const ALL: [StageKind; 3] = [
        StageKind::ResolveHandles,
        StageKind::GatherEvidence,
        StageKind::ScoreEvidence,
    ];

    /// Stable name used in logs and checkpoint files
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::ResolveHandles => "resolve_handles",
            StageKind::GatherEvidence => "gather_evidence",
            StageKind::ScoreEvidence => "score_evidence",
        }
    }

    /// Phase the run must be in before this stage
    #[must_use]
    pub fn requires(self) -> Phase {
        match self {
            StageKind::ResolveHandles => Phase::Start,
            StageKind::GatherEvidence => Phase::HandlesResolved,
            StageKind::ScoreEvidence => Phase::EvidenceGathered,
        }
    }

    /// Phase the run enters when this stage completes
    #[must_use]
    pub fn completes(self) -> Phase {
        match self {
            StageKind::ResolveHandles => Phase::HandlesResolved,
            StageKind::GatherEvidence => Phase::EvidenceGathered,
            StageKind::ScoreEvidence => Phase::Scored,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_forward_edges_are_legal() {
        assert!(validate_transition(Phase::Start, Phase::HandlesResolved).is_ok());
        assert!(validate_transition(Phase::Scored, Phase::Done).is_ok());

        assert!(validate_transition(Phase::Start, Phase::EvidenceGathered).is_err());
        assert!(validate_transition(Phase::HandlesResolved, Phase::Start).is_err());
        assert!(validate_transition(Phase::Done, Phase::Done).is_err());
    }

    #[test]
    fn done_is_terminal() {
        assert!(allowed_transitions(Phase::Done).is_empty());
        assert!(Phase::Done.is_terminal());
    }

    #[test]
    fn stages_chain_through_phases() {
        for pair in StageKind::ALL.windows(2) {
            assert_eq!(pair[0].completes(), pair[1].requires());
        }
        assert_eq!(StageKind::ALL[0].requires(), Phase::Start);
        assert_eq!(StageKind::ScoreEvidence.completes().next(), Some(Phase::Done));
    }
}
