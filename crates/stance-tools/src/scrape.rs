//! Shared scraper plumbing: arguments, settings and item filtering

use crate::normalize::normalize_text;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stance_agent::ToolInvocationError;
use stance_schema::{normalize_handle, RawEvidence};

/// Default number of posts fetched per network
pub const DEFAULT_MAX_POSTS: u32 = 10;
/// Default character budget of one post
pub const DEFAULT_MAX_POST_CHARS: usize = 1000;
/// Hard cap on posts per scraper call
pub const MAX_POSTS_LIMIT: u32 = 100;

/// Arguments of every post scraper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ScrapeArgs {
    /// Profile handle, without the leading '@'
    pub handle: String,
    /// How many of the most recent posts to fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_posts: Option<u32>,
}

impl ScrapeArgs {
    /// Create new arguments
    #[inline]
    #[must_use]
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            max_posts: None,
        }
    }

    /// Cleaned handle
    ///
    /// # Errors
    /// `ToolInvocationError` when the handle is blank or a placeholder.
    pub(crate) fn checked_handle(&self, tool_name: &str) -> Result<String, ToolInvocationError> {
        normalize_handle(&self.handle).ok_or_else(|| {
            ToolInvocationError::new(tool_name, format!("invalid handle `{}`", self.handle))
        })
    }
}

/// Limits applied by the scrapers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeSettings {
    /// Posts fetched when the model does not ask for a number
    pub max_posts: u32,
    /// Character budget of one post text
    pub max_post_chars: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            max_posts: DEFAULT_MAX_POSTS,
            max_post_chars: DEFAULT_MAX_POST_CHARS,
        }
    }
}

impl ScrapeSettings {
    /// Post count for one call
    #[must_use]
    pub fn post_count(&self, requested: Option<u32>) -> u32 {
        requested.unwrap_or(self.max_posts).clamp(1, MAX_POSTS_LIMIT)
    }
}

/// Turn dataset items into raw evidence.
///
/// `fields` picks `(url, text)` out of an item; items without both are
/// dropped with a warning. At most `limit` records are kept. An empty
/// result is an error: the tool found nothing the pipeline can use.
pub(crate) fn collect_evidence(
    tool_name: &str,
    items: &[Value],
    source: &str,
    limit: usize,
    max_chars: usize,
    fields: fn(&Value) -> Option<(String, String)>,
) -> Result<Vec<RawEvidence>, ToolInvocationError> {
    let mut evidence = Vec::new();
    let mut dropped = 0_usize;

    for item in items {
        if evidence.len() >= limit {
            break;
        }
        let record = fields(item).and_then(|(url, text)| {
            RawEvidence::try_new(url, normalize_text(&text, max_chars), source)
        });
        match record {
            Some(record) => evidence.push(record),
            None => {
                dropped += 1;
                tracing::debug!(tool = tool_name, %item, "Dropped item");
            }
        }
    }

    if dropped > 0 {
        tracing::warn!(tool = tool_name, dropped, "Skipped posts with missing fields");
    }
    if evidence.is_empty() {
        return Err(ToolInvocationError::new(
            tool_name,
            format!("no usable data ({} items returned)", items.len()),
        ));
    }
    Ok(evidence)
}

/// Non-blank string field
pub(crate) fn str_field<'a>(item: &'a Value, key: &str) -> Option<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
