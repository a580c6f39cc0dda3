//! Optional result cache for actor runs using moka
//!
//! Identical runs (same actor, same input) within the TTL are answered from
//! memory. Failed runs are never cached.

use crate::actor::ActorClient;
use crate::error::ActorError;
use moka::future::Cache;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Cache entry count snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Number of cached runs
    pub entry_count: u64,
}

/// `ActorClient` decorator that memoizes successful runs
#[derive(Clone)]
pub struct CachedActorClient {
    inner: Arc<dyn ActorClient>,
    cache: Cache<String, Arc<Vec<Value>>>,
}

impl CachedActorClient {
    /// Wrap `inner` with a cache of `max_capacity` runs kept for `ttl`
    #[must_use]
    pub fn new(inner: Arc<dyn ActorClient>, max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Current statistics, after applying pending inserts
    pub async fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks().await;
        CacheStats {
            entry_count: self.cache.entry_count(),
        }
    }

    fn key(actor_id: &str, input: &Value) -> String {
        format!("{actor_id}\n{input}")
    }
}

#[async_trait::async_trait]
impl ActorClient for CachedActorClient {
    async fn run_actor(&self, actor_id: &str, input: &Value) -> Result<Vec<Value>, ActorError> {
        let key = Self::key(actor_id, input);
        if let Some(items) = self.cache.get(&key).await {
            tracing::debug!(actor = actor_id, "Actor run served from cache");
            return Ok(items.as_ref().clone());
        }

        let items = self.inner.run_actor(actor_id, input).await?;
        self.cache.insert(key, Arc::new(items.clone())).await;
        Ok(items)
    }
}

impl std::fmt::Debug for CachedActorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedActorClient")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}
