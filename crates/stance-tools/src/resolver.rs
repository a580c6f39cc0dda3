//! Person name → social network handle resolver
//!
//! Searches the web for the person's profiles, one site-restricted query per
//! tracked network, and extracts handle candidates from the result URLs.
//! Choosing among candidates is left to the model.

use crate::actor::ActorClient;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use stance_agent::{Tool, ToolInvocationError};
use stance_schema::Network;
use std::collections::HashSet;
use std::sync::Arc;

/// Actor that runs web searches
pub const SEARCH_ACTOR: &str = "apify/google-search-scraper";
/// Tool name offered to the model
pub const RESOLVER_TOOL_NAME: &str = "person_name_to_social_network_handle";

const RESULTS_PER_QUERY: u32 = 10;

static X_PROFILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.|mobile\.)?(?:x|twitter)\.com/([A-Za-z0-9_]{1,15})/?(?:[?#].*)?$")
        .expect("static regex")
});

static INSTAGRAM_PROFILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^https?://(?:www\.)?instagram\.com/([A-Za-z0-9_.]{1,30})/?(?:[?#].*)?$")
        .expect("static regex")
});

/// Path segments that look like handles but are site pages
const RESERVED_PATHS: &[&str] = &[
    "home", "explore", "search", "hashtag", "i", "intent", "share", "settings", "login",
    "signup", "accounts", "about", "p", "reel", "reels", "stories", "tv", "direct",
];

/// Arguments of the resolver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResolveArgs {
    /// Full name of the person
    pub name: String,
}

/// One candidate profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HandleCandidate {
    /// Network name
    pub network: String,
    /// Handle extracted from the profile URL
    pub handle: String,
    /// Profile URL as found
    pub url: String,
    /// Search result title, usually the display name
    pub title: String,
}

/// Extract the profile handle from a URL on `network`
#[must_use]
pub fn handle_from_url(network: Network, url: &str) -> Option<String> {
    let pattern = match network {
        Network::X => &*X_PROFILE,
        Network::Instagram => &*INSTAGRAM_PROFILE,
    };
    let handle = pattern.captures(url.trim())?.get(1)?.as_str();
    if RESERVED_PATHS.contains(&handle.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(handle.to_string())
}

/// Resolver backed by a web search actor
#[derive(Clone)]
pub struct HandleResolverTool {
    client: Arc<dyn ActorClient>,
    networks: Vec<Network>,
}

impl HandleResolverTool {
    /// Create resolver searching `networks`
    #[must_use]
    pub fn new(client: Arc<dyn ActorClient>, networks: Vec<Network>) -> Self {
        Self { client, networks }
    }

    /// One query per network, newline separated as the actor expects
    #[must_use]
    pub fn actor_input(&self, name: &str) -> Value {
        let queries = self
            .networks
            .iter()
            .filter_map(|network| network.domains().first())
            .map(|domain| format!("\"{name}\" site:{domain}"))
            .collect::<Vec<_>>()
            .join("\n");
        json!({
            "queries": queries,
            "maxPagesPerQuery": 1,
            "resultsPerPage": RESULTS_PER_QUERY,
            "mobileResults": false,
        })
    }

    fn candidates(&self, pages: &[Value]) -> Vec<HandleCandidate> {
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();

        let results = pages
            .iter()
            .filter_map(|page| page.get("organicResults").and_then(Value::as_array))
            .flatten();
        for result in results {
            let Some(url) = result.get("url").and_then(Value::as_str) else {
                continue;
            };
            let title = result
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or_default();
            for network in &self.networks {
                let Some(handle) = handle_from_url(*network, url) else {
                    continue;
                };
                if seen.insert((*network, handle.to_ascii_lowercase())) {
                    candidates.push(HandleCandidate {
                        network: network.as_str().to_string(),
                        handle,
                        url: url.to_string(),
                        title: title.to_string(),
                    });
                }
            }
        }
        candidates
    }
}

#[async_trait::async_trait]
impl Tool for HandleResolverTool {
    type Args = ResolveArgs;
    type Output = Vec<HandleCandidate>;

    fn name(&self) -> &str {
        RESOLVER_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Search the web for a person's social network profiles. Returns candidate \
         handles with the profile URL and page title; pick the one that belongs \
         to the person."
    }

    async fn call(&self, args: ResolveArgs) -> Result<Vec<HandleCandidate>, ToolInvocationError> {
        let name = args.name.trim();
        if name.is_empty() {
            return Err(ToolInvocationError::new(RESOLVER_TOOL_NAME, "empty person name"));
        }
        tracing::info!(tool = RESOLVER_TOOL_NAME, name, "Searching for profiles");

        let pages = self
            .client
            .run_actor(SEARCH_ACTOR, &self.actor_input(name))
            .await
            .map_err(|e| e.into_tool_error(RESOLVER_TOOL_NAME))?;

        let candidates = self.candidates(&pages);
        tracing::debug!(tool = RESOLVER_TOOL_NAME, candidates = candidates.len(), "Search finished");
        if candidates.is_empty() {
            return Err(ToolInvocationError::new(
                RESOLVER_TOOL_NAME,
                format!("no profiles found for `{name}`"),
            ));
        }
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingActor;
    use pretty_assertions::assert_eq;

    #[test]
    fn extracts_profile_handles() {
        assert_eq!(handle_from_url(Network::X, "https://x.com/tomio_cz"), Some("tomio_cz".into()));
        assert_eq!(
            handle_from_url(Network::X, "https://twitter.com/tomio_cz/?lang=cs"),
            Some("tomio_cz".into())
        );
        assert_eq!(
            handle_from_url(Network::Instagram, "https://www.instagram.com/tomio.okamura/"),
            Some("tomio.okamura".into())
        );
    }

    #[test]
    fn ignores_posts_and_site_pages() {
        assert_eq!(handle_from_url(Network::X, "https://x.com/tomio_cz/status/123"), None);
        assert_eq!(handle_from_url(Network::X, "https://x.com/search?q=tomio"), None);
        assert_eq!(handle_from_url(Network::Instagram, "https://www.instagram.com/p/Cx1/"), None);
        assert_eq!(handle_from_url(Network::Instagram, "https://x.com/tomio_cz"), None);
    }

    #[test]
    fn one_query_per_network() {
        let tool = HandleResolverTool::new(
            Arc::new(CountingActor::returning(Vec::new())),
            Network::ALL.to_vec(),
        );
        let input = tool.actor_input("Tomio Okamura");
        assert_eq!(
            input["queries"],
            "\"Tomio Okamura\" site:x.com\n\"Tomio Okamura\" site:instagram.com"
        );
    }

    #[tokio::test]
    async fn candidates_are_deduplicated() {
        let actor = Arc::new(CountingActor::returning(vec![
            json!({"organicResults": [
                {"url": "https://x.com/tomio_cz", "title": "Tomio Okamura (@tomio_cz) / X"},
                {"url": "https://twitter.com/Tomio_CZ", "title": "Tomio Okamura"},
                {"url": "https://x.com/tomio_cz/status/1", "title": "post"},
            ]}),
            json!({"organicResults": [
                {"url": "https://www.instagram.com/tomio.okamura/", "title": "Tomio Okamura"},
            ]}),
        ]));
        let tool = HandleResolverTool::new(actor, Network::ALL.to_vec());

        let candidates = tool
            .call(ResolveArgs { name: "Tomio Okamura".into() })
            .await
            .unwrap();
        let found: Vec<_> = candidates
            .iter()
            .map(|c| (c.network.as_str(), c.handle.as_str()))
            .collect();
        assert_eq!(found, vec![("X", "tomio_cz"), ("Instagram", "tomio.okamura")]);
    }

    #[tokio::test]
    async fn no_candidates_is_a_tool_error() {
        let actor = Arc::new(CountingActor::returning(vec![json!({"organicResults": []})]));
        let tool = HandleResolverTool::new(actor, Network::ALL.to_vec());
        let err = tool
            .call(ResolveArgs { name: "Nobody".into() })
            .await
            .unwrap_err();
        assert!(err.cause.contains("no profiles found"));
    }
}
