//! Apify actor client
//!
//! Every external lookup (search, X, Instagram) is an actor run whose
//! dataset items come back as JSON. The synchronous run endpoint starts the
//! actor, waits for it and returns the items in one request.

use crate::error::ActorError;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Default API root
pub const APIFY_API_URL: &str = "https://api.apify.com/v2";

const MAX_ERROR_BODY: usize = 500;

/// Runs actors and returns their dataset items
#[async_trait::async_trait]
pub trait ActorClient: Send + Sync {
    /// Run `actor_id` with `input` and wait for its items
    ///
    /// # Errors
    /// `ActorError` when the run cannot be started, fails, or returns
    /// something other than a list of items.
    async fn run_actor(&self, actor_id: &str, input: &Value) -> Result<Vec<Value>, ActorError>;
}

/// Connection settings for the Apify API
#[derive(Debug, Clone)]
pub struct ApifyConfig {
    /// API token
    pub token: String,
    /// API root
    pub base_url: String,
    /// Whole-run timeout in seconds
    pub timeout_secs: u64,
}

impl ApifyConfig {
    /// Settings for `token` against the public API
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: APIFY_API_URL.to_string(),
            timeout_secs: 300,
        }
    }

    /// Settings with the token from `APIFY_TOKEN`
    ///
    /// # Errors
    /// `ActorError::Config` when the variable is unset.
    pub fn from_env() -> Result<Self, ActorError> {
        std::env::var("APIFY_TOKEN")
            .map(Self::new)
            .map_err(|_| ActorError::Config("APIFY_TOKEN is not set".to_string()))
    }

    /// With a different API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// `ActorClient` over the Apify REST API
#[derive(Debug, Clone)]
pub struct ApifyClient {
    http: Client,
    config: ApifyConfig,
}

impl ApifyClient {
    /// Create client
    ///
    /// # Errors
    /// `ActorError::Config` for an empty token or an unbuildable HTTP client.
    pub fn new(config: ApifyConfig) -> Result<Self, ActorError> {
        if config.token.trim().is_empty() {
            return Err(ActorError::Config("empty API token".to_string()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ActorError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Synchronous run endpoint for `actor_id`
    ///
    /// Actor ids use `/` between owner and name; the API path uses `~`.
    #[must_use]
    pub fn run_url(&self, actor_id: &str) -> String {
        format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.config.base_url.trim_end_matches('/'),
            actor_id.replace('/', "~")
        )
    }
}

#[async_trait::async_trait]
impl ActorClient for ApifyClient {
    async fn run_actor(&self, actor_id: &str, input: &Value) -> Result<Vec<Value>, ActorError> {
        tracing::debug!(actor = actor_id, %input, "Starting actor run");

        let response = self
            .http
            .post(self.run_url(actor_id))
            .bearer_auth(&self.config.token)
            .json(input)
            .send()
            .await
            .map_err(|e| ActorError::Start {
                actor: actor_id.to_string(),
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ActorError::Rejected {
                actor: actor_id.to_string(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let items: Vec<Value> = response.json().await.map_err(|e| ActorError::Decode {
            actor: actor_id.to_string(),
            detail: e.to_string(),
        })?;
        tracing::info!(actor = actor_id, items = items.len(), "Actor run finished");
        Ok(items)
    }
}
