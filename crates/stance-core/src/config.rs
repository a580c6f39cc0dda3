//! Pipeline configuration
//!
//! Loaded from TOML, every key optional. Secrets never live here: the model
//! and actor clients read their keys from the environment.
//!
//! ```toml
//! stance = "pro-western"
//! postsPerNetwork = 10
//! networks = ["X", "Instagram"]
//!
//! [model]
//! name = "gpt-4o"
//!
//! [cache]
//! enabled = true
//! ttlSecs = 3600
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use stance_agent::{OpenAiConfig, DEFAULT_MAX_TURNS};
use stance_schema::Network;
use stance_tools::{ScrapeSettings, DEFAULT_MAX_POSTS, DEFAULT_MAX_POST_CHARS};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Stance investigated when none is configured
pub const DEFAULT_STANCE: &str = "pro-western";

/// Re-prompts allowed for structured output, first attempt included
pub const DEFAULT_VALIDATION_ATTEMPTS: usize = 2;

/// Run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Stance under investigation, e.g. "pro-western"
    pub stance: String,
    /// What counts as evidence for the stance, listed in the scoring prompt
    pub stance_factors: Vec<String>,
    /// Most recent posts fetched per network
    pub posts_per_network: u32,
    /// Turn cap of each agent loop
    pub max_agent_turns: usize,
    /// Attempts for each structured answer
    pub validation_attempts: usize,
    /// Character budget of one post
    pub max_post_chars: usize,
    /// Ask the model to transliterate evidence text to ASCII
    pub ascii_only: bool,
    /// Networks searched and scraped
    pub networks: Vec<Network>,
    /// Language model
    pub model: ModelConfig,
    /// Actor result cache
    pub cache: CacheConfig,
    /// Stage snapshots
    pub checkpoint: CheckpointConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stance: DEFAULT_STANCE.to_string(),
            stance_factors: vec![
                "Support for western democratic values".to_string(),
                "Positive mentions of western countries, institutions, or leaders".to_string(),
                "Alignment with western foreign policy positions".to_string(),
                "Support for western economic systems".to_string(),
            ],
            posts_per_network: DEFAULT_MAX_POSTS,
            max_agent_turns: DEFAULT_MAX_TURNS,
            validation_attempts: DEFAULT_VALIDATION_ATTEMPTS,
            max_post_chars: DEFAULT_MAX_POST_CHARS,
            ascii_only: false,
            networks: Network::ALL.to_vec(),
            model: ModelConfig::default(),
            cache: CacheConfig::default(),
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// `ConfigError::Parse` for malformed TOML or unknown networks.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `ConfigError::Read` when the file is unreadable, otherwise as
    /// `from_toml_str`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Reject values the pipeline cannot run with
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.stance.trim().is_empty() {
            return invalid("stance must not be empty");
        }
        if self.posts_per_network == 0 {
            return invalid("postsPerNetwork must be at least 1");
        }
        if self.max_agent_turns == 0 {
            return invalid("maxAgentTurns must be at least 1");
        }
        if self.validation_attempts == 0 {
            return invalid("validationAttempts must be at least 1");
        }
        if self.max_post_chars == 0 {
            return invalid("maxPostChars must be at least 1");
        }
        if self.networks.is_empty() {
            return invalid("networks must not be empty");
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return invalid("cache.capacity must be at least 1");
        }
        Ok(())
    }

    /// With stance
    #[inline]
    #[must_use]
    pub fn with_stance(mut self, stance: impl Into<String>) -> Self {
        self.stance = stance.into();
        self
    }

    /// With posts per network
    #[inline]
    #[must_use]
    pub fn with_posts_per_network(mut self, posts: u32) -> Self {
        self.posts_per_network = posts;
        self
    }

    /// With agent turn cap
    #[inline]
    #[must_use]
    pub fn with_max_agent_turns(mut self, turns: usize) -> Self {
        self.max_agent_turns = turns;
        self
    }

    /// With structured output attempts
    #[inline]
    #[must_use]
    pub fn with_validation_attempts(mut self, attempts: usize) -> Self {
        self.validation_attempts = attempts;
        self
    }

    /// With tracked networks
    #[inline]
    #[must_use]
    pub fn with_networks(mut self, networks: Vec<Network>) -> Self {
        self.networks = networks;
        self
    }

    /// With ASCII transliteration
    #[inline]
    #[must_use]
    pub fn with_ascii_only(mut self, ascii_only: bool) -> Self {
        self.ascii_only = ascii_only;
        self
    }

    /// With model name
    #[inline]
    #[must_use]
    pub fn with_model(mut self, name: impl Into<String>) -> Self {
        self.model.name = name.into();
        self
    }

    /// With actor cache switched on or off
    #[inline]
    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache.enabled = enabled;
        self
    }

    /// With checkpoint directory
    #[inline]
    #[must_use]
    pub fn with_checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.checkpoint.dir = Some(dir.into());
        self
    }

    /// Limits handed to the scrapers
    #[must_use]
    pub fn scrape_settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            max_posts: self.posts_per_network,
            max_post_chars: self.max_post_chars,
        }
    }
}

/// Language model settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelConfig {
    /// Model name
    pub name: String,
    /// API root
    pub base_url: String,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        let openai = OpenAiConfig::default();
        Self {
            name: openai.model,
            base_url: openai.base_url,
            temperature: Some(0.0),
            timeout_secs: openai.timeout_secs,
        }
    }
}

impl ModelConfig {
    /// As OpenAI client settings
    #[must_use]
    pub fn to_openai(&self) -> OpenAiConfig {
        OpenAiConfig {
            model: self.name.clone(),
            base_url: self.base_url.clone(),
            temperature: self.temperature,
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Actor result cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Off unless asked for
    pub enabled: bool,
    /// Maximum cached actor runs
    pub capacity: u64,
    /// Entry lifetime in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            capacity: 256,
            ttl_secs: 3600,
        }
    }
}

impl CacheConfig {
    /// Entry lifetime
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Stage snapshot settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Directory for snapshot files; no snapshots when unset
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_agent_turns, 8);
        assert_eq!(config.validation_attempts, 2);
        assert_eq!(config.posts_per_network, 10);
        assert!(!config.cache.enabled);
        assert!(!config.ascii_only);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            stance = "pro-EU"
            postsPerNetwork = 5
            networks = ["twitter"]

            [model]
            name = "gpt-4o-mini"

            [cache]
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(config.stance, "pro-EU");
        assert_eq!(config.posts_per_network, 5);
        assert_eq!(config.networks, vec![Network::X]);
        assert_eq!(config.model.name, "gpt-4o-mini");
        assert_eq!(config.model.base_url, stance_agent::openai::DEFAULT_BASE_URL);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.capacity, 256);
        assert_eq!(config.max_agent_turns, 8);
    }

    #[test]
    fn unknown_network_is_a_parse_error() {
        let err = PipelineConfig::from_toml_str(r#"networks = ["myspace"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn zero_limits_are_rejected() {
        for config in [
            PipelineConfig::new().with_max_agent_turns(0),
            PipelineConfig::new().with_validation_attempts(0),
            PipelineConfig::new().with_posts_per_network(0),
            PipelineConfig::new().with_stance("  "),
            PipelineConfig::new().with_networks(Vec::new()),
        ] {
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn zero_post_chars_is_rejected() {
        let mut config = PipelineConfig::new();
        config.max_post_chars = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("maxPostChars")));
    }

    #[test]
    fn empty_cache_is_rejected_only_when_enabled() {
        let mut config = PipelineConfig::new();
        config.cache.capacity = 0;
        assert!(config.validate().is_ok());

        let err = config.with_cache(true).validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("cache.capacity")));
    }

    #[test]
    fn scrape_settings_follow_config() {
        let settings = PipelineConfig::new().with_posts_per_network(3).scrape_settings();
        assert_eq!(settings.max_posts, 3);
        assert_eq!(settings.max_post_chars, DEFAULT_MAX_POST_CHARS);
    }
}
