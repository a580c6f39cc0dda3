//! Relevance-weighted aggregation and the final report

use crate::state::PipelineState;
use serde::{Deserialize, Serialize};
use stance_schema::{Evidence, SCORE_MAX, SCORE_MIN};

/// Relevance-weighted mean of the scores, clamped to the score range.
///
/// `0.0` when there is no evidence or the relevances do not sum to a
/// positive weight. The sum runs in a canonical order, so permuting the
/// input never changes the result.
#[must_use]
pub fn aggregate(evidence: &[Evidence]) -> f64 {
    let mut terms: Vec<(f64, f64)> = evidence.iter().map(|e| (e.score, e.relevance)).collect();
    terms.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let (weighted, weight) = terms
        .iter()
        .fold((0.0_f64, 0.0_f64), |(sum, total), &(score, relevance)| {
            (sum + score * relevance, total + relevance)
        });
    if weight <= 0.0 || weight.is_nan() || !weighted.is_finite() {
        return 0.0;
    }
    (weighted / weight).clamp(SCORE_MIN, SCORE_MAX)
}

/// Most relevant first; ties keep their input order
#[must_use]
pub fn presentation_order(mut evidence: Vec<Evidence>) -> Vec<Evidence> {
    evidence.sort_by(|a, b| b.relevance.total_cmp(&a.relevance));
    evidence
}

/// What a finished run reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanceReport {
    /// Person investigated
    pub subject: String,
    /// Stance investigated
    pub stance: String,
    /// Aggregated score in [-1, 1]
    pub score: f64,
    /// Scored evidence, most relevant first
    pub evidence: Vec<Evidence>,
}

impl StanceReport {
    /// Build the report from a scored state
    #[must_use]
    pub fn from_state(state: &PipelineState) -> Self {
        let evidence = state.evidence().unwrap_or_default();
        Self {
            subject: state.subject_name().to_string(),
            stance: state.stance().to_string(),
            score: aggregate(evidence),
            evidence: presentation_order(evidence.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use stance_test_utils::scored;

    #[test]
    fn weighted_mean_of_scores() {
        let evidence = vec![scored(1.0, 1.0), scored(-0.5, 0.5)];
        assert!((aggregate(&evidence) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn irrelevant_evidence_scores_zero() {
        assert_eq!(aggregate(&[scored(0.8, 0.0)]), 0.0);
        assert_eq!(aggregate(&[]), 0.0);
    }

    #[test]
    fn most_relevant_first_with_stable_ties() {
        let mut a = scored(0.1, 0.5);
        a.url = "a".into();
        let mut b = scored(0.2, 0.9);
        b.url = "b".into();
        let mut c = scored(0.3, 0.5);
        c.url = "c".into();

        let order: Vec<_> = presentation_order(vec![a, b, c]).into_iter().map(|e| e.url).collect();
        assert_eq!(order, ["b", "a", "c"]);
    }

    fn evidence_strategy() -> impl Strategy<Value = Vec<Evidence>> {
        prop::collection::vec((-1.0_f64..=1.0, 0.0_f64..=1.0), 0..32)
            .prop_map(|pairs| pairs.into_iter().map(|(s, r)| scored(s, r)).collect())
    }

    proptest! {
        #[test]
        fn aggregate_stays_in_range(evidence in evidence_strategy()) {
            let score = aggregate(&evidence);
            prop_assert!((SCORE_MIN..=SCORE_MAX).contains(&score));
        }

        #[test]
        fn aggregate_ignores_order(evidence in evidence_strategy(), seed in any::<u64>()) {
            let mut shuffled = evidence.clone();
            // deterministic rotation plus reversal covers reorderings without a RNG
            if !shuffled.is_empty() {
                let k = usize::try_from(seed % shuffled.len() as u64).unwrap_or(0);
                shuffled.rotate_left(k);
                if seed % 2 == 0 {
                    shuffled.reverse();
                }
            }
            prop_assert_eq!(aggregate(&evidence).to_bits(), aggregate(&shuffled).to_bits());
        }

        #[test]
        fn zero_relevance_everywhere_scores_zero(scores in prop::collection::vec(-1.0_f64..=1.0, 0..16)) {
            let evidence: Vec<_> = scores.into_iter().map(|s| scored(s, 0.0)).collect();
            prop_assert_eq!(aggregate(&evidence), 0.0);
        }

        #[test]
        fn presentation_keeps_every_item(evidence in evidence_strategy()) {
            let ordered = presentation_order(evidence.clone());
            prop_assert_eq!(ordered.len(), evidence.len());
            prop_assert!(ordered.windows(2).all(|w| w[0].relevance >= w[1].relevance));
        }
    }
}
