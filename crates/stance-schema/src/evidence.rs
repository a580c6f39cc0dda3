//! Raw and scored evidence records
//!
//! Field names are part of the model-facing JSON contract and of the
//! pipeline's output, so they are kept flat: `url`, `text`, `source`,
//! `score`, `relevance`.

use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, NumberValidation, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lower bound of a stance score (strongly against)
pub const SCORE_MIN: f64 = -1.0;
/// Upper bound of a stance score (strongly for)
pub const SCORE_MAX: f64 = 1.0;
/// Lower bound of relevance (not relevant)
pub const RELEVANCE_MIN: f64 = 0.0;
/// Upper bound of relevance (highly relevant)
pub const RELEVANCE_MAX: f64 = 1.0;

/// An unscored post collected from a social network
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct RawEvidence {
    /// Link to the post
    #[schemars(length(min = 1))]
    pub url: String,
    /// Post text
    #[schemars(length(min = 1))]
    pub text: String,
    /// Network the post came from, e.g. "X/Twitter"
    #[schemars(length(min = 1))]
    pub source: String,
}

impl RawEvidence {
    /// Build a record, or `None` when any field is blank
    #[must_use]
    pub fn try_new(
        url: impl Into<String>,
        text: impl Into<String>,
        source: impl Into<String>,
    ) -> Option<Self> {
        let evidence = Self {
            url: url.into(),
            text: text.into(),
            source: source.into(),
        };
        evidence.is_complete().then_some(evidence)
    }

    /// All three fields are non-blank
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.text.trim().is_empty() && !self.source.trim().is_empty()
    }
}

/// Evidence list as exchanged with the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RawEvidenceList {
    /// Every collected post, unfiltered
    pub evidences: Vec<RawEvidence>,
}

/// A post scored for stance alignment and relevance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Evidence {
    /// Link to the post
    #[schemars(length(min = 1))]
    pub url: String,
    /// Post text
    #[schemars(length(min = 1))]
    pub text: String,
    /// Network the post came from
    #[schemars(length(min = 1))]
    pub source: String,
    /// Stance alignment, -1.0 (against) to 1.0 (for)
    #[schemars(schema_with = "score_schema")]
    pub score: f64,
    /// How much the post says about the stance, 0.0 to 1.0
    #[schemars(schema_with = "relevance_schema")]
    pub relevance: f64,
}

impl Evidence {
    /// Attach scores to a raw record
    #[must_use]
    pub fn from_raw(raw: RawEvidence, score: f64, relevance: f64) -> Self {
        Self {
            url: raw.url,
            text: raw.text,
            source: raw.source,
            score,
            relevance,
        }
    }

    /// The unscored part of this record
    #[must_use]
    pub fn raw(&self) -> RawEvidence {
        RawEvidence {
            url: self.url.clone(),
            text: self.text.clone(),
            source: self.source.clone(),
        }
    }

    /// Both scores are finite and inside their ranges
    #[must_use]
    pub fn is_within_bounds(&self) -> bool {
        (SCORE_MIN..=SCORE_MAX).contains(&self.score)
            && (RELEVANCE_MIN..=RELEVANCE_MAX).contains(&self.relevance)
    }
}

/// Scored evidence list as returned by the model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvidenceList {
    /// One entry per analysed post
    pub evidences: Vec<Evidence>,
}

fn bounded_number(min: f64, max: f64) -> Schema {
    SchemaObject {
        instance_type: Some(InstanceType::Number.into()),
        number: Some(Box::new(NumberValidation {
            minimum: Some(min),
            maximum: Some(max),
            ..NumberValidation::default()
        })),
        ..SchemaObject::default()
    }
    .into()
}

fn score_schema(_: &mut SchemaGenerator) -> Schema {
    bounded_number(SCORE_MIN, SCORE_MAX)
}

fn relevance_schema(_: &mut SchemaGenerator) -> Schema {
    bounded_number(RELEVANCE_MIN, RELEVANCE_MAX)
}
