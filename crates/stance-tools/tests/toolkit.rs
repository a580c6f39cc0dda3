//! Apify toolkit driven through the agent loop

use pretty_assertions::assert_eq;
use serde_json::json;
use stance_agent::{AgentLoop, Toolbox};
use stance_schema::{Network, RawEvidence};
use stance_test_utils::{call, text, tool_calls, ScriptedLlm, StaticActorClient};
use stance_tools::{
    ApifyToolkit, CachedActorClient, ScrapeSettings, Toolkit, INSTAGRAM_SCRAPER_ACTOR,
    INSTAGRAM_TOOL_NAME, RESOLVER_TOOL_NAME, SEARCH_ACTOR, X_SCRAPER_ACTOR, X_TOOL_NAME,
};
use std::sync::Arc;
use std::time::Duration;

fn actors() -> Arc<StaticActorClient> {
    Arc::new(
        StaticActorClient::new()
            .with_items(
                SEARCH_ACTOR,
                vec![json!({"organicResults": [
                    {"url": "https://x.com/tomio_cz", "title": "Tomio Okamura (@tomio_cz) / X"},
                    {"url": "https://x.com/search?q=okamura", "title": "Search"},
                    {"url": "https://www.instagram.com/tomio.okamura/", "title": "Tomio Okamura"}
                ]})],
            )
            .with_items(
                X_SCRAPER_ACTOR,
                vec![
                    json!({"url": "https://x.com/tomio_cz/status/1", "text": "First   post\n\nwith spacing"}),
                    json!({"twitterUrl": "https://x.com/tomio_cz/status/2", "fullText": "Second post"}),
                    json!({"noise": true}),
                ],
            ),
    )
}

#[tokio::test]
async fn resolver_returns_profile_candidates_only() {
    let actors = actors();
    let toolkit = ApifyToolkit::new(actors.clone());

    let candidates = toolkit
        .handle_resolver()
        .invoke(json!({"name": "Tomio Okamura"}))
        .await
        .unwrap();

    let handles: Vec<_> = candidates
        .as_array()
        .unwrap()
        .iter()
        .map(|c| (c["network"].as_str().unwrap(), c["handle"].as_str().unwrap()))
        .collect();
    assert_eq!(handles, [("X", "tomio_cz"), ("Instagram", "tomio.okamura")]);

    let runs = actors.runs();
    assert_eq!(runs.len(), 1);
    let queries = runs[0].1["queries"].as_str().unwrap();
    assert!(queries.contains("\"Tomio Okamura\" site:x.com"));
    assert!(queries.contains("\"Tomio Okamura\" site:instagram.com"));
}

#[tokio::test]
async fn agent_loop_scrapes_through_the_toolkit() {
    let actors = actors();
    let toolkit = ApifyToolkit::new(actors.clone()).with_settings(ScrapeSettings {
        max_posts: 5,
        max_post_chars: 100,
    });
    let toolbox = Toolbox::from_tools([toolkit.scraper(Network::X).unwrap()]).unwrap();
    let llm = ScriptedLlm::new([
        tool_calls(vec![call("s1", X_TOOL_NAME, json!({"handle": "@tomio_cz"}))]),
        text("done"),
    ]);

    let run = AgentLoop::new(&llm, &toolbox).run("gather").await.unwrap();

    assert_eq!(run.answer, "done");
    let result: Vec<RawEvidence> = serde_json::from_str(&run.transcript[2].content).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result[0].text, "First post with spacing");
    assert_eq!(result[1].url, "https://x.com/tomio_cz/status/2");
    assert!(result.iter().all(|e| e.source == "X/Twitter"));

    let (actor, input) = &actors.runs()[0];
    assert_eq!(actor, X_SCRAPER_ACTOR);
    assert_eq!(input["maxItems"], 5);
}

#[tokio::test]
async fn missing_actor_data_is_reported_to_the_model() {
    let toolkit = ApifyToolkit::new(actors());
    let err = toolkit
        .scraper(Network::Instagram)
        .unwrap()
        .invoke(json!({"handle": "tomio.okamura"}))
        .await
        .unwrap_err();

    assert_eq!(err.tool_name, INSTAGRAM_TOOL_NAME);
    assert!(err.cause.contains(INSTAGRAM_SCRAPER_ACTOR));
}

#[tokio::test]
async fn cached_client_runs_each_search_once() {
    let actors = actors();
    let cached = Arc::new(CachedActorClient::new(actors.clone(), 16, Duration::from_secs(60)));
    let resolver = ApifyToolkit::new(cached).handle_resolver();

    for _ in 0..3 {
        resolver.invoke(json!({"name": "Tomio Okamura"})).await.unwrap();
    }

    assert_eq!(actors.runs().len(), 1);
}

#[test]
fn only_tracked_networks_get_tools() {
    let toolkit = ApifyToolkit::new(actors()).with_networks(vec![Network::X]);
    assert!(toolkit.scraper(Network::X).is_some());
    assert!(toolkit.scraper(Network::Instagram).is_none());
    assert_eq!(toolkit.handle_resolver().spec().name, RESOLVER_TOOL_NAME);
}
