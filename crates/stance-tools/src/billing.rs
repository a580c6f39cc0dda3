//! Pay-per-event metering
//!
//! The pipeline charges three events: the run start (per GB of memory), each
//! gathered evidence item, and the scoring analysis. Charging is
//! fire-and-forget for callers: a failed charge is reported, never retried.

use crate::actor::APIFY_API_URL;
use crate::error::BillingError;
use reqwest::Client;
use serde_json::json;

/// Run start, counted per started GB of memory
pub const EVENT_ACTOR_START: &str = "actor-start-gb";
/// One gathered evidence item
pub const EVENT_EVIDENCE: &str = "evidence";
/// One scoring analysis
pub const EVENT_AI_ANALYSIS: &str = "ai-analysis";

/// Billing sink
#[async_trait::async_trait]
pub trait Meter: Send + Sync {
    /// Charge `count` units of `event`
    ///
    /// # Errors
    /// `BillingError` when the charge could not be recorded.
    async fn charge(&self, event: &str, count: u64) -> Result<(), BillingError>;
}

/// Units charged for the run start: memory in GB, rounded up, at least one
#[must_use]
pub fn actor_start_units(memory_mbytes: Option<u64>) -> u64 {
    memory_mbytes.map_or(1, |mb| mb.div_ceil(1024).max(1))
}

/// Meter that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMeter;

#[async_trait::async_trait]
impl Meter for LogMeter {
    async fn charge(&self, event: &str, count: u64) -> Result<(), BillingError> {
        tracing::info!(event, count, "Charge (not billed)");
        Ok(())
    }
}

/// Meter posting charges for the current Apify run
#[derive(Debug, Clone)]
pub struct ApifyMeter {
    http: Client,
    token: String,
    run_id: String,
    base_url: String,
}

impl ApifyMeter {
    /// Create meter for `run_id`
    ///
    /// # Errors
    /// `BillingError::Config` for an empty token or run id.
    pub fn new(token: impl Into<String>, run_id: impl Into<String>) -> Result<Self, BillingError> {
        let token = token.into();
        let run_id = run_id.into();
        if token.trim().is_empty() || run_id.trim().is_empty() {
            return Err(BillingError::Config("token and run id are required".to_string()));
        }
        Ok(Self {
            http: Client::new(),
            token,
            run_id,
            base_url: APIFY_API_URL.to_string(),
        })
    }

    /// Meter for the run in `ACTOR_RUN_ID`, authenticated with `APIFY_TOKEN`
    ///
    /// # Errors
    /// `BillingError::Config` when either variable is unset.
    pub fn from_env() -> Result<Self, BillingError> {
        let token = std::env::var("APIFY_TOKEN")
            .map_err(|_| BillingError::Config("APIFY_TOKEN is not set".to_string()))?;
        let run_id = std::env::var("ACTOR_RUN_ID")
            .map_err(|_| BillingError::Config("ACTOR_RUN_ID is not set".to_string()))?;
        Self::new(token, run_id)
    }

    /// With a different API root
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Charge endpoint of this run
    #[must_use]
    pub fn charge_url(&self) -> String {
        format!(
            "{}/actor-runs/{}/charge",
            self.base_url.trim_end_matches('/'),
            self.run_id
        )
    }
}

#[async_trait::async_trait]
impl Meter for ApifyMeter {
    async fn charge(&self, event: &str, count: u64) -> Result<(), BillingError> {
        tracing::debug!(event, count, run_id = %self.run_id, "Charging event");
        let failed = |detail: String| BillingError::Charge {
            event: event.to_string(),
            detail,
        };

        let response = self
            .http
            .post(self.charge_url())
            .bearer_auth(&self.token)
            .json(&json!({ "eventName": event, "count": count }))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("status {status}")));
        }
        Ok(())
    }
}
