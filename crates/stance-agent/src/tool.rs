//! Tool registry
//!
//! Tools are written against typed arguments and outputs (`Tool`) and
//! erased to JSON in/JSON out (`DynTool`) when registered in a `Toolbox`.
//! The toolbox is the only way the agent loop reaches a tool: names the
//! model invents are rejected before any dispatch happens.

use crate::error::{AgentError, ToolInvocationError};
use crate::schema::schema_value;
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Model-facing description of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name
    pub name: String,
    /// What the tool does, shown to the model
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: Value,
    /// JSON schema of the result
    pub output: Value,
}

/// Typed tool implementation
#[async_trait::async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Decoded arguments
    type Args: DeserializeOwned + JsonSchema + Send;
    /// Result handed back to the model
    type Output: Serialize + JsonSchema + Send;

    /// Unique tool name
    fn name(&self) -> &str;

    /// What the tool does
    fn description(&self) -> &str;

    /// Run the tool
    ///
    /// # Errors
    /// `ToolInvocationError` when the backing service fails or has no data.
    async fn call(&self, args: Self::Args) -> Result<Self::Output, ToolInvocationError>;
}

/// Type-erased tool as stored in a `Toolbox`
#[async_trait::async_trait]
pub trait DynTool: Send + Sync {
    /// Name, description and schemas
    fn spec(&self) -> ToolSpec;

    /// Decode arguments, run, encode result
    ///
    /// # Errors
    /// `ToolInvocationError` for undecodable arguments or a failed call.
    async fn invoke(&self, arguments: Value) -> Result<Value, ToolInvocationError>;
}

#[async_trait::async_trait]
impl<T: Tool> DynTool for T {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: schema_value::<T::Args>(),
            output: schema_value::<T::Output>(),
        }
    }

    async fn invoke(&self, arguments: Value) -> Result<Value, ToolInvocationError> {
        let args: T::Args = serde_json::from_value(arguments)
            .map_err(|e| ToolInvocationError::new(self.name(), format!("invalid arguments: {e}")))?;
        let output = self.call(args).await?;
        serde_json::to_value(output)
            .map_err(|e| ToolInvocationError::new(self.name(), format!("unserializable result: {e}")))
    }
}

/// Named set of tools offered to one agent loop
#[derive(Clone, Default)]
pub struct Toolbox {
    tools: IndexMap<String, (ToolSpec, Arc<dyn DynTool>)>,
}

impl Toolbox {
    /// Create empty toolbox
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from tools, rejecting duplicate names
    ///
    /// # Errors
    /// `AgentError::DuplicateTool` when two tools share a name.
    pub fn from_tools(tools: impl IntoIterator<Item = Arc<dyn DynTool>>) -> Result<Self, AgentError> {
        let mut toolbox = Self::new();
        for tool in tools {
            toolbox.register(tool)?;
        }
        Ok(toolbox)
    }

    /// Register one tool
    ///
    /// # Errors
    /// `AgentError::DuplicateTool` when the name is taken.
    pub fn register(&mut self, tool: Arc<dyn DynTool>) -> Result<(), AgentError> {
        let spec = tool.spec();
        if self.tools.contains_key(&spec.name) {
            return Err(AgentError::DuplicateTool(spec.name));
        }
        self.tools.insert(spec.name.clone(), (spec, tool));
        Ok(())
    }

    /// Tool registered under `name`
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn DynTool>> {
        self.tools.get(name).map(|(_, tool)| tool)
    }

    /// Whether `name` is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Specs in registration order
    #[must_use]
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|(spec, _)| spec.clone()).collect()
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.tools.keys().map(String::as_str)
    }

    /// Number of tools
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tool is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for Toolbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}
