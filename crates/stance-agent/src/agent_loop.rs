//! Tool-calling agent loop
//!
//! One reasoning stage: the model gets a goal and a toolbox, and the loop
//! keeps executing whatever tools it asks for until it gives a final answer.
//!
//! # Transcript contract
//! The returned transcript starts with the goal and then holds exactly one
//! message per model turn and one per executed tool call, in call order.
//! A failing tool still produces its message: the error text becomes the
//! result so the model can route around it. The same tool failing twice
//! within one loop ends the loop. A batch naming any tool outside the
//! toolbox ends the loop before any of its calls runs.

use crate::error::{AgentError, ToolInvocationError};
use crate::llm::{Completion, CompletionRequest, LlmClient};
use crate::message::{Message, ToolCall};
use crate::schema::OutputSchema;
use crate::tool::{DynTool, Toolbox};
use crate::validator::StructuredOutputValidator;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

/// Turn cap used when none is configured
pub const DEFAULT_MAX_TURNS: usize = 8;

/// Result of a converged loop
#[derive(Debug, Clone)]
pub struct AgentRun<T> {
    /// Messages exchanged, goal first
    pub transcript: Vec<Message>,
    /// Final answer
    pub answer: T,
    /// Model turns used
    pub turns: usize,
}

/// Agent loop over a borrowed model and toolbox
pub struct AgentLoop<'a> {
    llm: &'a dyn LlmClient,
    toolbox: &'a Toolbox,
    max_turns: usize,
    label: &'a str,
}

impl<'a> AgentLoop<'a> {
    /// Create loop with the default turn cap
    #[inline]
    #[must_use]
    pub fn new(llm: &'a dyn LlmClient, toolbox: &'a Toolbox) -> Self {
        Self {
            llm,
            toolbox,
            max_turns: DEFAULT_MAX_TURNS,
            label: "agent",
        }
    }

    /// With turn cap (at least one turn)
    #[inline]
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// With a label used in log events
    #[inline]
    #[must_use]
    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = label;
        self
    }

    /// Run until the model answers in free text
    ///
    /// # Errors
    /// Any `AgentError`; see the module docs for which tool failures are fatal.
    pub async fn run(&self, goal: &str) -> Result<AgentRun<String>, AgentError> {
        let (transcript, terminal, turns) = self.drive(goal, None).await?;
        let answer = match terminal {
            Completion::Text(text) | Completion::ToolCalls { content: text, .. } => text,
            Completion::Structured(value) => value.to_string(),
        };
        Ok(AgentRun {
            transcript,
            answer,
            turns,
        })
    }

    /// Run until the model answers with a `T`
    ///
    /// The schema of `T` is sent with every request. A final answer that
    /// does not conform is fatal: the loop never hands back malformed data.
    ///
    /// # Errors
    /// `AgentError::Validation` for a non-conforming answer, plus everything
    /// `run` returns.
    pub async fn run_structured<T>(&self, goal: &str) -> Result<AgentRun<T>, AgentError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let validator = StructuredOutputValidator::<T>::new()?;
        let (transcript, terminal, turns) = self.drive(goal, Some(validator.schema())).await?;
        let answer = validator.validate_completion(terminal)?;
        Ok(AgentRun {
            transcript,
            answer,
            turns,
        })
    }

    /// Run with `schema` offered to the model and hand back the final answer
    /// unvalidated, for callers that re-prompt on a bad answer themselves
    ///
    /// # Errors
    /// Everything `run` returns.
    pub async fn run_for_schema(
        &self,
        goal: &str,
        schema: &OutputSchema,
    ) -> Result<AgentRun<Completion>, AgentError> {
        let (transcript, answer, turns) = self.drive(goal, Some(schema)).await?;
        Ok(AgentRun {
            transcript,
            answer,
            turns,
        })
    }

    async fn drive(
        &self,
        goal: &str,
        schema: Option<&OutputSchema>,
    ) -> Result<(Vec<Message>, Completion, usize), AgentError> {
        let specs = self.toolbox.specs();
        let mut messages = vec![Message::user(goal)];
        let mut failures: HashMap<String, usize> = HashMap::new();

        for turn in 1..=self.max_turns {
            tracing::debug!(agent = self.label, turn, "Requesting completion");
            let request = CompletionRequest::new(&messages)
                .with_tools(&specs)
                .with_output_schema(schema);
            let completion = self.llm.complete(request).await?;
            messages.push(completion.to_message());

            let calls = match completion {
                Completion::ToolCalls { calls, .. } if !calls.is_empty() => calls,
                terminal => return Ok((messages, terminal, turn)),
            };

            let dispatch = self.resolve(&calls)?;
            for (call, tool) in dispatch {
                let (message, failure) = Self::execute(self.label, call, tool).await;
                messages.push(message);
                if let Some(err) = failure {
                    let count = failures.entry(call.name.clone()).or_default();
                    *count += 1;
                    if *count > 1 {
                        return Err(AgentError::Tool(err));
                    }
                }
            }
        }

        tracing::warn!(agent = self.label, max_turns = self.max_turns, "Agent loop did not converge");
        Err(AgentError::LoopDidNotConverge {
            max_turns: self.max_turns,
        })
    }

    /// Look up every call of a batch; one unknown name rejects the whole batch
    fn resolve<'c>(
        &self,
        calls: &'c [ToolCall],
    ) -> Result<Vec<(&'c ToolCall, &'a Arc<dyn DynTool>)>, AgentError> {
        calls
            .iter()
            .map(|call| match self.toolbox.get(&call.name) {
                Some(tool) => Ok((call, tool)),
                None => {
                    let offered: Vec<&str> = self.toolbox.names().collect();
                    tracing::error!(
                        agent = self.label,
                        tool = %call.name,
                        ?offered,
                        "Unknown tool requested"
                    );
                    Err(AgentError::UnknownTool {
                        name: call.name.clone(),
                    })
                }
            })
            .collect()
    }

    /// Run one requested tool; the message is returned even when it fails
    async fn execute(
        label: &str,
        call: &ToolCall,
        tool: &Arc<dyn DynTool>,
    ) -> (Message, Option<ToolInvocationError>) {
        tracing::info!(agent = label, tool = %call.name, "Invoking tool");
        tracing::debug!(tool = %call.name, arguments = %call.arguments, "Tool arguments");
        match tool.invoke(call.arguments.clone()).await {
            Ok(value) => (Message::tool_result(call, value.to_string()), None),
            Err(err) => {
                tracing::warn!(agent = label, tool = %call.name, "Tool failed: {}", err.cause);
                (Message::tool_error(call, &err), Some(err))
            }
        }
    }
}
