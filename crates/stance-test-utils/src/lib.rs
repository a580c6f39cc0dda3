//! Testing utilities for the Stance workspace
//!
//! Scripted model, fake tools and collaborators, and evidence fixtures.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde_json::Value;
use stance_agent::{
    Completion, CompletionRequest, DynTool, LlmClient, Message, ModelError, Tool, ToolCall,
    ToolInvocationError,
};
use stance_schema::{Evidence, Network, RawEvidence};
use stance_tools::{ActorClient, ActorError, BillingError, Meter, Toolkit};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// What the scripted model was asked
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
    pub output_schema: Option<String>,
}

/// `LlmClient` answering from a fixed script, in order
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    script: Mutex<VecDeque<Result<Completion, ModelError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedLlm {
    pub fn new(script: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append an error answer
    pub fn then_fail(self, error: ModelError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Completion, ModelError> {
        self.requests.lock().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
            output_schema: request.output_schema.map(|s| s.name.clone()),
        });
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Unavailable("script exhausted".to_string())))
    }
}

pub fn text(content: &str) -> Completion {
    Completion::Text(content.to_string())
}

pub fn structured(value: Value) -> Completion {
    Completion::Structured(value)
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, arguments)
}

pub fn tool_calls(calls: Vec<ToolCall>) -> Completion {
    Completion::ToolCalls {
        content: String::new(),
        calls,
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

/// Tool with a configurable name and scripted results
///
/// Results are consumed in order; the last one repeats.
#[derive(Debug)]
pub struct FakeTool {
    name: String,
    results: Mutex<VecDeque<Result<Value, String>>>,
    calls: Mutex<Vec<Value>>,
}

impl FakeTool {
    pub fn new(name: &str, results: Vec<Result<Value, String>>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(name: &str, output: Value) -> Arc<Self> {
        Self::new(name, vec![Ok(output)])
    }

    pub fn failing(name: &str, cause: &str) -> Arc<Self> {
        Self::new(name, vec![Err(cause.to_string())])
    }

    /// Arguments of every call, in order
    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn dyn_tool(self: &Arc<Self>) -> Arc<dyn DynTool> {
        Arc::clone(self) as Arc<dyn DynTool>
    }
}

#[async_trait::async_trait]
impl Tool for FakeTool {
    type Args = Value;
    type Output = Value;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "fake tool"
    }

    async fn call(&self, args: Value) -> Result<Value, ToolInvocationError> {
        self.calls.lock().push(args);
        let mut results = self.results.lock();
        let result = if results.len() > 1 {
            results.pop_front()
        } else {
            results.front().cloned()
        };
        match result {
            Some(Ok(value)) => Ok(value),
            Some(Err(cause)) => Err(ToolInvocationError::new(&self.name, cause)),
            None => Err(ToolInvocationError::new(&self.name, "no scripted result")),
        }
    }
}

/// Toolkit built from fake tools
#[derive(Debug)]
pub struct FakeToolkit {
    resolver: Arc<FakeTool>,
    scrapers: HashMap<Network, Arc<FakeTool>>,
}

impl FakeToolkit {
    pub fn new(resolver: Arc<FakeTool>) -> Self {
        Self {
            resolver,
            scrapers: HashMap::new(),
        }
    }

    pub fn with_scraper(mut self, network: Network, tool: Arc<FakeTool>) -> Self {
        self.scrapers.insert(network, tool);
        self
    }
}

impl Toolkit for FakeToolkit {
    fn handle_resolver(&self) -> Arc<dyn DynTool> {
        self.resolver.dyn_tool()
    }

    fn scraper(&self, network: Network) -> Option<Arc<dyn DynTool>> {
        self.scrapers.get(&network).map(FakeTool::dyn_tool)
    }
}

/// Actor client returning fixed items per actor id
#[derive(Debug, Default)]
pub struct StaticActorClient {
    items: HashMap<String, Vec<Value>>,
    runs: Mutex<Vec<(String, Value)>>,
}

impl StaticActorClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(mut self, actor_id: &str, items: Vec<Value>) -> Self {
        self.items.insert(actor_id.to_string(), items);
        self
    }

    pub fn runs(&self) -> Vec<(String, Value)> {
        self.runs.lock().clone()
    }
}

#[async_trait::async_trait]
impl ActorClient for StaticActorClient {
    async fn run_actor(&self, actor_id: &str, input: &Value) -> Result<Vec<Value>, ActorError> {
        self.runs.lock().push((actor_id.to_string(), input.clone()));
        self.items.get(actor_id).cloned().ok_or_else(|| ActorError::Start {
            actor: actor_id.to_string(),
            detail: "unknown actor".to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Billing
// ---------------------------------------------------------------------------

/// Meter that records charges, optionally failing each one
#[derive(Debug, Default)]
pub struct RecordingMeter {
    charges: Mutex<Vec<(String, u64)>>,
    fail: bool,
}

impl RecordingMeter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn charges(&self) -> Vec<(String, u64)> {
        self.charges.lock().clone()
    }
}

#[async_trait::async_trait]
impl Meter for RecordingMeter {
    async fn charge(&self, event: &str, count: u64) -> Result<(), BillingError> {
        self.charges.lock().push((event.to_string(), count));
        if self.fail {
            return Err(BillingError::Charge {
                event: event.to_string(),
                detail: "recording meter set to fail".to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn raw(url: &str, text: &str, source: &str) -> RawEvidence {
    RawEvidence {
        url: url.to_string(),
        text: text.to_string(),
        source: source.to_string(),
    }
}

/// `n` X posts with distinct URLs
pub fn raw_posts(n: usize) -> Vec<RawEvidence> {
    (1..=n)
        .map(|i| {
            raw(
                &format!("https://x.com/tomio_cz/status/{i}"),
                &format!("post {i}"),
                "X/Twitter",
            )
        })
        .collect()
}

pub fn scored(score: f64, relevance: f64) -> Evidence {
    Evidence::from_raw(raw("https://example.com/post", "text", "X/Twitter"), score, relevance)
}

/// Score every raw item with the same values
pub fn score_all(raw: &[RawEvidence], score: f64, relevance: f64) -> Vec<Evidence> {
    raw.iter()
        .cloned()
        .map(|r| Evidence::from_raw(r, score, relevance))
        .collect()
}
