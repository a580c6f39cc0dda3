//! Stance Tools - external service adapters
//!
//! Thin, fallible wrappers around the services the pipeline depends on:
//! - `ActorClient` / `ApifyClient`: runs scraping actors, optionally through
//!   `CachedActorClient`
//! - `HandleResolverTool`: person name → candidate profile handles
//! - `XPostsTool`, `InstagramPostsTool`: recent posts as `RawEvidence`
//! - `Toolkit`: hands the stages the tools they may offer the model
//! - `Meter`: pay-per-event billing
//!
//! Scrapers drop items missing a URL or text, normalize and truncate post
//! text, and fail with `ToolInvocationError` when nothing usable is left.

#![warn(unreachable_pub)]

pub mod actor;
pub mod billing;
pub mod cache;
pub mod error;
pub mod instagram;
pub mod normalize;
pub mod resolver;
pub mod scrape;
pub mod toolkit;
pub mod x;

pub use actor::{ActorClient, ApifyClient, ApifyConfig, APIFY_API_URL};
pub use billing::{
    actor_start_units, ApifyMeter, LogMeter, Meter, EVENT_ACTOR_START, EVENT_AI_ANALYSIS,
    EVENT_EVIDENCE,
};
pub use cache::{CacheStats, CachedActorClient};
pub use error::{ActorError, BillingError};
pub use instagram::{InstagramPostsTool, INSTAGRAM_SCRAPER_ACTOR, INSTAGRAM_TOOL_NAME};
pub use normalize::normalize_text;
pub use resolver::{
    handle_from_url, HandleCandidate, HandleResolverTool, ResolveArgs, RESOLVER_TOOL_NAME,
    SEARCH_ACTOR,
};
pub use scrape::{ScrapeArgs, ScrapeSettings, DEFAULT_MAX_POSTS, DEFAULT_MAX_POST_CHARS};
pub use toolkit::{ApifyToolkit, Toolkit};
pub use x::{XPostsTool, X_SCRAPER_ACTOR, X_TOOL_NAME};

#[cfg(test)]
mod testing {
    use crate::actor::ActorClient;
    use crate::error::ActorError;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Actor stub with a fixed answer that records its runs
    pub(crate) struct CountingActor {
        items: Option<Vec<Value>>,
        calls: AtomicUsize,
        last: Mutex<Option<(String, Value)>>,
    }

    impl CountingActor {
        pub(crate) fn returning(items: Vec<Value>) -> Self {
            Self {
                items: Some(items),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                items: None,
                ..Self::returning(Vec::new())
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn last_run(&self) -> Option<(String, Value)> {
            self.last.lock().clone()
        }
    }

    #[async_trait::async_trait]
    impl ActorClient for CountingActor {
        async fn run_actor(&self, actor_id: &str, input: &Value) -> Result<Vec<Value>, ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock() = Some((actor_id.to_string(), input.clone()));
            self.items.clone().ok_or_else(|| ActorError::Start {
                actor: actor_id.to_string(),
                detail: "stub failure".to_string(),
            })
        }
    }
}
