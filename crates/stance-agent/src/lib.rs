//! Stance Agent - tool-calling agent loop
//!
//! The reasoning primitive every pipeline stage is built from:
//! - `LlmClient`: the model seam, with an OpenAI chat-completions adapter
//! - `Tool` / `Toolbox`: typed tools erased to JSON and looked up by name
//! - `AgentLoop`: bounded loop of model turns and tool invocations
//! - `StructuredOutputValidator`: checks final answers against a JSON schema
//!
//! # Example
//!
//! ```rust,ignore
//! use stance_agent::{AgentLoop, OpenAiClient, OpenAiConfig, Toolbox};
//! use stance_schema::SocialMediaHandles;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let llm = OpenAiClient::from_env(OpenAiConfig::new("gpt-4o"))?;
//! let toolbox = Toolbox::new();
//! let run = AgentLoop::new(&llm, &toolbox)
//!     .run_structured::<SocialMediaHandles>("Find the handles of Tomio Okamura")
//!     .await?;
//! println!("{} handles in {} turns", run.answer.handles.len(), run.turns);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod agent_loop;
pub mod error;
pub mod llm;
pub mod message;
pub mod openai;
pub mod schema;
pub mod tool;
pub mod validator;

pub use agent_loop::{AgentLoop, AgentRun, DEFAULT_MAX_TURNS};
pub use error::{AgentError, ModelError, ToolInvocationError, ValidationError};
pub use llm::{Completion, CompletionRequest, LlmClient};
pub use message::{Message, Role, ToolCall, Transcript};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use schema::{schema_value, OutputSchema};
pub use tool::{DynTool, Tool, ToolSpec, Toolbox};
pub use validator::StructuredOutputValidator;
