//! X (Twitter) post scraper

use crate::actor::ActorClient;
use crate::scrape::{collect_evidence, str_field, ScrapeArgs, ScrapeSettings};
use serde_json::{json, Value};
use stance_agent::{Tool, ToolInvocationError};
use stance_schema::{Network, RawEvidence};
use std::sync::Arc;

/// Actor that scrapes tweets
pub const X_SCRAPER_ACTOR: &str = "apidojo/tweet-scraper";
/// Tool name offered to the model
pub const X_TOOL_NAME: &str = "scrape_x_posts";

/// Most recent posts of one X profile
#[derive(Clone)]
pub struct XPostsTool {
    client: Arc<dyn ActorClient>,
    settings: ScrapeSettings,
}

impl XPostsTool {
    /// Create new scraper
    #[must_use]
    pub fn new(client: Arc<dyn ActorClient>, settings: ScrapeSettings) -> Self {
        Self { client, settings }
    }

    /// Actor input for one profile
    #[must_use]
    pub fn actor_input(handle: &str, max_posts: u32) -> Value {
        json!({
            "twitterHandles": [handle],
            "maxItems": max_posts,
            "onlyVerifiedUsers": false,
            "onlyTwitterBlue": false,
            "sort": "Latest",
        })
    }
}

fn tweet_fields(item: &Value) -> Option<(String, String)> {
    let url = str_field(item, "url").or_else(|| str_field(item, "twitterUrl"))?;
    let text = str_field(item, "text").or_else(|| str_field(item, "fullText"))?;
    Some((url.to_string(), text.to_string()))
}

#[async_trait::async_trait]
impl Tool for XPostsTool {
    type Args = ScrapeArgs;
    type Output = Vec<RawEvidence>;

    fn name(&self) -> &str {
        X_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch the most recent posts of an X (Twitter) profile. \
         `handle` is the profile handle without the '@' symbol."
    }

    async fn call(&self, args: ScrapeArgs) -> Result<Vec<RawEvidence>, ToolInvocationError> {
        let handle = args.checked_handle(X_TOOL_NAME)?;
        let max_posts = self.settings.post_count(args.max_posts);
        tracing::info!(tool = X_TOOL_NAME, %handle, max_posts, "Scraping X posts");

        let items = self
            .client
            .run_actor(X_SCRAPER_ACTOR, &Self::actor_input(&handle, max_posts))
            .await
            .map_err(|e| e.into_tool_error(X_TOOL_NAME))?;

        collect_evidence(
            X_TOOL_NAME,
            &items,
            Network::X.source_label(),
            max_posts as usize,
            self.settings.max_post_chars,
            tweet_fields,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingActor;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn scrapes_and_labels_posts() {
        let actor = Arc::new(CountingActor::returning(vec![
            json!({"url": "https://x.com/tomio_cz/status/1", "text": "Czech first!"}),
            json!({"twitterUrl": "https://x.com/tomio_cz/status/2", "fullText": "Second\npost"}),
            json!({"noResults": true}),
        ]));
        let tool = XPostsTool::new(actor.clone(), ScrapeSettings::default());

        let mut args = ScrapeArgs::new("@tomio_cz");
        args.max_posts = Some(5);
        let evidence = tool.call(args).await.unwrap();

        assert_eq!(evidence.len(), 2);
        assert_eq!(evidence[1].text, "Second post");
        assert!(evidence.iter().all(|e| e.source == "X/Twitter"));

        let (actor_id, input) = actor.last_run().unwrap();
        assert_eq!(actor_id, X_SCRAPER_ACTOR);
        assert_eq!(input["twitterHandles"], json!(["tomio_cz"]));
        assert_eq!(input["maxItems"], 5);
        assert_eq!(input["sort"], "Latest");
    }

    #[tokio::test]
    async fn actor_failure_is_a_tool_error() {
        let tool = XPostsTool::new(Arc::new(CountingActor::failing()), ScrapeSettings::default());
        let err = tool.call(ScrapeArgs::new("tomio_cz")).await.unwrap_err();
        assert_eq!(err.tool_name, X_TOOL_NAME);
    }
}
