//! Prompt text for the three stages

use serde_json::json;
use stance_agent::ValidationError;
use stance_schema::{HandleMap, Network, RawEvidence, SCORE_MAX, SCORE_MIN};
use std::fmt::Write;

fn network_list(networks: &[Network]) -> String {
    networks.iter().map(Network::as_str).collect::<Vec<_>>().join(", ")
}

/// Goal of the handle resolution loop
#[must_use]
pub fn handle_resolution(name: &str, networks: &[Network]) -> String {
    format!(
        "Find the social media handles of the person {name} on these networks: {}.\n\
         Use the search tool, check that each profile really belongs to {name}, \
         and answer with one line per network in the form `Network: handle`. \
         Leave out networks where you found no profile.",
        network_list(networks)
    )
}

/// Turns the resolver's free-text answer into the handle list
#[must_use]
pub fn handle_extraction(answer: &str, networks: &[Network]) -> String {
    format!(
        "Extract the social media handles from the text below. Allowed networks: {}. \
         Write each handle without the leading '@' and omit networks that have no handle.\n\n\
         Text:\n{answer}",
        network_list(networks)
    )
}

/// Goal of the evidence gathering loop
#[must_use]
pub fn evidence_gathering(handles: &HandleMap, posts_per_network: u32, ascii_only: bool) -> String {
    let mut mapping = String::new();
    for (network, handle) in handles.iter() {
        let _ = writeln!(mapping, "{network}: {handle}");
    }

    let mut prompt = format!(
        "You are an agent that gathers evidence from social media.\n\n\
         Use the social media handles from this mapping:\n{mapping}\n\
         Instructions:\n\
         1. Get the {posts_per_network} most recent posts from each social network using the person's handle.\n\
         2. For each social network, only use the corresponding handle from the mapping above.\n\
         3. If the mapping has no handle for a social network, skip that network.\n\
         4. Combine all evidence into a single list.\n\
         5. Do not filter or remove any evidence.\n"
    );
    if ascii_only {
        prompt.push_str("6. Convert all non-ASCII characters to their closest ASCII equivalents.\n");
    }
    prompt
}

/// Single-shot scoring prompt
#[must_use]
pub fn scoring(stance: &str, factors: &[String], evidence: &[RawEvidence]) -> String {
    let items: Vec<_> = evidence
        .iter()
        .map(|e| json!({"url": e.url, "text": e.text, "source": e.source}))
        .collect();
    let items = serde_json::to_string_pretty(&items).unwrap_or_default();

    let mut considerations = String::new();
    for factor in factors {
        let _ = writeln!(considerations, "- {factor}");
    }

    format!(
        "Analyze the following pieces of evidence and score them based on how {stance} they are.\n\
         For each evidence, provide a score between {SCORE_MIN:.1} and {SCORE_MAX:.1} (inclusive), where:\n\
         - {SCORE_MAX:.1} represents strongly {stance} sentiment\n\
         - {SCORE_MIN:.1} represents strongly opposing sentiment\n\n\
         Consider factors such as:\n{considerations}\n\
         For each evidence, provide a relevance between 0.0 and 1.0 (inclusive), where:\n\
         - 1.0 represents highly relevant evidence\n\
         - 0.0 represents not relevant at all\n\n\
         Evidence is relevant if it can be used to support or refute the claim that the person is {stance}.\n\n\
         Evidence to analyze:\n{items}\n\n\
         Return {count} items as {{\"evidences\": [{{\"url\", \"text\", \"source\", \"score\", \"relevance\"}}]}}, \
         one per piece of evidence. Copy url, text and source over unchanged.",
        count = evidence.len()
    )
}

/// Follow-up after a rejected structured answer
#[must_use]
pub fn retry_feedback(error: &ValidationError) -> String {
    format!(
        "Your previous answer was rejected: {error}\n\
         Answer again with only the corrected JSON document."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathering_prompt_lists_only_mapped_networks() {
        let handles = HandleMap::new().with(Network::X, "tomio_cz");
        let prompt = evidence_gathering(&handles, 10, false);
        assert!(prompt.contains("X: tomio_cz"));
        assert!(!prompt.contains("Instagram"));
        assert!(prompt.contains("10 most recent posts"));
        assert!(!prompt.contains("ASCII"));
    }

    #[test]
    fn ascii_instruction_is_optional() {
        let handles = HandleMap::new().with(Network::X, "tomio_cz");
        assert!(evidence_gathering(&handles, 10, true).contains("closest ASCII equivalents"));
    }

    #[test]
    fn scoring_prompt_carries_every_item() {
        let evidence = vec![
            RawEvidence::try_new("https://x.com/a/1", "first", "X/Twitter").unwrap(),
            RawEvidence::try_new("https://x.com/a/2", "second", "X/Twitter").unwrap(),
        ];
        let prompt = scoring("pro-western", &["Support for NATO".to_string()], &evidence);
        assert!(prompt.contains("https://x.com/a/2"));
        assert!(prompt.contains("- Support for NATO"));
        assert!(prompt.contains("between -1.0 and 1.0"));
        assert!(prompt.contains("Return 2 items"));
    }
}
