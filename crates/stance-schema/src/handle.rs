//! Social media handle records
//!
//! `SocialMediaHandles` is the shape the model is asked to produce;
//! `HandleMap` is the validated mapping the pipeline carries forward.

use crate::network::Network;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Values a model uses when it could not find a handle
const PLACEHOLDERS: &[&str] = &["none", "n/a", "na", "null", "unknown", "not found", "-"];

/// One handle on one network, as reported by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SocialMediaHandle {
    /// Network name, e.g. "X" or "Instagram"
    #[schemars(length(min = 1))]
    pub network: String,
    /// Handle on that network, without the leading '@'
    #[schemars(length(min = 1))]
    pub handle: String,
}

impl SocialMediaHandle {
    /// Create new handle record
    #[inline]
    #[must_use]
    pub fn new(network: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            handle: handle.into(),
        }
    }
}

/// Handle list produced by the handle resolution stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SocialMediaHandles {
    /// Handles found; omit networks without a handle
    pub handles: Vec<SocialMediaHandle>,
}

/// Network → handle mapping, at most one handle per network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleMap(IndexMap<Network, String>);

impl HandleMap {
    /// Create empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a handle for `network`; an existing entry is kept
    #[must_use]
    pub fn with(mut self, network: Network, handle: impl Into<String>) -> Self {
        self.insert(network, handle.into());
        self
    }

    /// Build from the model's handle list.
    ///
    /// Unknown networks, empty or placeholder handles are left out, so a
    /// network without a discoverable handle is simply absent. The first
    /// handle reported for a network wins.
    #[must_use]
    pub fn from_handles(handles: &SocialMediaHandles) -> Self {
        let mut map = Self::new();
        for entry in &handles.handles {
            let network = match entry.network.parse::<Network>() {
                Ok(network) => network,
                Err(e) => {
                    tracing::warn!(network = %entry.network, "Dropping handle: {}", e);
                    continue;
                }
            };
            let Some(handle) = normalize_handle(&entry.handle) else {
                tracing::debug!(%network, "No usable handle reported");
                continue;
            };
            if !map.insert(network, handle) {
                tracing::warn!(%network, handle = %entry.handle, "Duplicate handle dropped");
            }
        }
        map
    }

    fn insert(&mut self, network: Network, handle: String) -> bool {
        if self.0.contains_key(&network) {
            return false;
        }
        self.0.insert(network, handle);
        true
    }

    /// Handle on `network`, if any
    #[inline]
    #[must_use]
    pub fn get(&self, network: Network) -> Option<&str> {
        self.0.get(&network).map(String::as_str)
    }

    /// Whether a handle is known for `network`
    #[inline]
    #[must_use]
    pub fn contains(&self, network: Network) -> bool {
        self.0.contains_key(&network)
    }

    /// Networks with a handle, in insertion order
    pub fn networks(&self) -> impl Iterator<Item = Network> + '_ {
        self.0.keys().copied()
    }

    /// (network, handle) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (Network, &str)> + '_ {
        self.0.iter().map(|(n, h)| (*n, h.as_str()))
    }

    /// Number of networks with a handle
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no handle was resolved at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Trim whitespace and a leading '@'; `None` for blanks and placeholders
#[must_use]
pub fn normalize_handle(raw: &str) -> Option<String> {
    let handle = raw.trim().trim_start_matches('@').trim();
    if handle.is_empty() || PLACEHOLDERS.contains(&handle.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(handle.to_string())
}
