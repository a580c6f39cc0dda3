//! JSON schemas handed to the model

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named JSON schema for a structured answer or a tool signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name (type name of the Rust record)
    pub name: String,
    /// Draft-07 schema document
    pub schema: Value,
}

impl OutputSchema {
    /// Schema generated from a Rust type
    #[must_use]
    pub fn of<T: JsonSchema>() -> Self {
        Self {
            name: T::schema_name(),
            schema: schema_value::<T>(),
        }
    }
}

/// Root schema of `T` as a JSON value
#[must_use]
pub fn schema_value<T: JsonSchema>() -> Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}
