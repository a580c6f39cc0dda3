//! Instagram profile post scraper

use crate::actor::ActorClient;
use crate::scrape::{collect_evidence, str_field, ScrapeArgs, ScrapeSettings};
use serde_json::{json, Value};
use stance_agent::{Tool, ToolInvocationError};
use stance_schema::{Network, RawEvidence};
use std::sync::Arc;

/// Actor that scrapes Instagram
pub const INSTAGRAM_SCRAPER_ACTOR: &str = "apify/instagram-scraper";
/// Tool name offered to the model
pub const INSTAGRAM_TOOL_NAME: &str = "scrape_instagram_posts";

/// Most recent posts of one Instagram profile
#[derive(Clone)]
pub struct InstagramPostsTool {
    client: Arc<dyn ActorClient>,
    settings: ScrapeSettings,
}

impl InstagramPostsTool {
    /// Create new scraper
    #[must_use]
    pub fn new(client: Arc<dyn ActorClient>, settings: ScrapeSettings) -> Self {
        Self { client, settings }
    }

    /// Actor input for one profile
    #[must_use]
    pub fn actor_input(handle: &str, max_posts: u32) -> Value {
        json!({
            "directUrls": [format!("https://www.instagram.com/{handle}/")],
            "resultsLimit": max_posts,
            "resultsType": "posts",
            "searchLimit": 1,
        })
    }
}

/// Caption, followed by the image alt text when there is one
fn post_fields(item: &Value) -> Option<(String, String)> {
    let url = str_field(item, "url")?;
    let caption = str_field(item, "caption")?;
    let text = match str_field(item, "alt") {
        Some(alt) => format!("{caption} {alt}"),
        None => caption.to_string(),
    };
    Some((url.to_string(), text))
}

#[async_trait::async_trait]
impl Tool for InstagramPostsTool {
    type Args = ScrapeArgs;
    type Output = Vec<RawEvidence>;

    fn name(&self) -> &str {
        INSTAGRAM_TOOL_NAME
    }

    fn description(&self) -> &str {
        "Fetch the most recent posts of an Instagram profile. \
         `handle` is the profile handle without the '@' symbol."
    }

    async fn call(&self, args: ScrapeArgs) -> Result<Vec<RawEvidence>, ToolInvocationError> {
        let handle = args.checked_handle(INSTAGRAM_TOOL_NAME)?;
        let max_posts = self.settings.post_count(args.max_posts);
        tracing::info!(tool = INSTAGRAM_TOOL_NAME, %handle, max_posts, "Scraping Instagram posts");

        let items = self
            .client
            .run_actor(INSTAGRAM_SCRAPER_ACTOR, &Self::actor_input(&handle, max_posts))
            .await
            .map_err(|e| e.into_tool_error(INSTAGRAM_TOOL_NAME))?;

        collect_evidence(
            INSTAGRAM_TOOL_NAME,
            &items,
            Network::Instagram.source_label(),
            max_posts as usize,
            self.settings.max_post_chars,
            post_fields,
        )
    }
}
