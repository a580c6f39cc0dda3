//! Stance Schema - typed records shared across the pipeline
//!
//! Pure data contracts, no behaviour beyond construction checks:
//! - `Network` and the `HandleMap` produced by handle resolution
//! - `RawEvidence` collected by the scrapers
//! - `Evidence` scored by the model
//!
//! The `*List` wrappers are the exact JSON shapes the model is asked to
//! return; their `JsonSchema` impls drive structured-output validation.

#![warn(unreachable_pub)]

pub mod evidence;
pub mod handle;
pub mod network;

pub use evidence::{
    Evidence, EvidenceList, RawEvidence, RawEvidenceList, RELEVANCE_MAX, RELEVANCE_MIN,
    SCORE_MAX, SCORE_MIN,
};
pub use handle::{normalize_handle, HandleMap, SocialMediaHandle, SocialMediaHandles};
pub use network::{Network, UnknownNetwork};
