//! Structured output validation
//!
//! Turns model output into a typed record: extract the JSON document from
//! the text, check it against the record's JSON schema (field names, types,
//! numeric ranges), then decode. The validator never calls the model;
//! re-prompting on failure is up to the caller.

use crate::error::ValidationError;
use crate::llm::Completion;
use crate::schema::OutputSchema;
use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("static regex"));

/// Validator for one target record type
pub struct StructuredOutputValidator<T> {
    schema: OutputSchema,
    compiled: JSONSchema,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned + JsonSchema> StructuredOutputValidator<T> {
    /// Compile the schema of `T`
    ///
    /// # Errors
    /// `ValidationError::InvalidSchema` if the generated schema does not compile.
    pub fn new() -> Result<Self, ValidationError> {
        let schema = OutputSchema::of::<T>();
        let compiled = JSONSchema::compile(&schema.schema).map_err(|e| {
            ValidationError::InvalidSchema {
                schema: schema.name.clone(),
                detail: e.to_string(),
            }
        })?;
        Ok(Self {
            schema,
            compiled,
            _marker: PhantomData,
        })
    }

    /// Schema offered to the model
    #[inline]
    #[must_use]
    pub fn schema(&self) -> &OutputSchema {
        &self.schema
    }

    /// Parse free-form model text
    ///
    /// Accepts bare JSON, JSON inside a markdown code fence, or JSON embedded
    /// in surrounding prose.
    ///
    /// # Errors
    /// `Syntax` when no JSON document is found, `Schema`/`Decode` otherwise.
    pub fn parse(&self, text: &str) -> Result<T, ValidationError> {
        let json = extract_json(text)?;
        let value: Value =
            serde_json::from_str(json).map_err(|e| ValidationError::Syntax(e.to_string()))?;
        self.validate_value(value)
    }

    /// Check and decode an already-parsed JSON value
    ///
    /// # Errors
    /// `Schema` on any schema violation, `Decode` if decoding still fails.
    pub fn validate_value(&self, value: Value) -> Result<T, ValidationError> {
        if let Err(errors) = self.compiled.validate(&value) {
            let violations = errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() {
                        e.to_string()
                    } else {
                        format!("{path}: {e}")
                    }
                })
                .collect();
            return Err(ValidationError::Schema {
                schema: self.schema.name.clone(),
                violations,
            });
        }
        serde_json::from_value(value).map_err(|e| ValidationError::Decode {
            schema: self.schema.name.clone(),
            detail: e.to_string(),
        })
    }

    /// Validate a model completion that should be a final answer
    ///
    /// # Errors
    /// `UnexpectedToolCall` for tool requests, otherwise as `parse`.
    pub fn validate_completion(&self, completion: Completion) -> Result<T, ValidationError> {
        match completion {
            Completion::Text(text) => self.parse(&text),
            Completion::Structured(value) => self.validate_value(value),
            Completion::ToolCalls { content, calls } if calls.is_empty() => self.parse(&content),
            other @ Completion::ToolCalls { .. } => {
                Err(ValidationError::UnexpectedToolCall(other.requested_tools()))
            }
        }
    }
}

impl<T> std::fmt::Debug for StructuredOutputValidator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredOutputValidator")
            .field("schema", &self.schema.name)
            .finish_non_exhaustive()
    }
}

/// Locate the JSON document inside model text
fn extract_json(text: &str) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if let Some(inner) = CODE_FENCE.captures(trimmed).and_then(|c| c.get(1)) {
        return Ok(inner.as_str());
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&trimmed[start..=end]),
        _ => Err(ValidationError::Syntax("no JSON object found in output".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize, JsonSchema)]
    struct Rating {
        #[schemars(range(min = 0, max = 10))]
        stars: u8,
        comment: String,
    }

    fn validator() -> StructuredOutputValidator<Rating> {
        StructuredOutputValidator::new().unwrap()
    }

    #[test]
    fn parses_fenced_json() {
        let text = "Here you go:\n```json\n{\"stars\": 4, \"comment\": \"ok\"}\n```";
        let rating = validator().parse(text).unwrap();
        assert_eq!(rating, Rating { stars: 4, comment: "ok".into() });
    }

    #[test]
    fn parses_json_inside_prose() {
        let text = "Result: {\"stars\": 1, \"comment\": \"meh\"} -- done";
        assert_eq!(validator().parse(text).unwrap().stars, 1);
    }

    #[test]
    fn missing_field_is_a_schema_error() {
        let err = validator().parse("{\"stars\": 4}").unwrap_err();
        match err {
            ValidationError::Schema { schema, violations } => {
                assert_eq!(schema, "Rating");
                assert!(violations.iter().any(|v| v.contains("comment")));
            }
            other => panic!("expected Schema, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_is_rejected() {
        let err = validator()
            .parse("{\"stars\": 11, \"comment\": \"x\"}")
            .unwrap_err();
        assert!(matches!(err, ValidationError::Schema { .. }));
    }

    #[test]
    fn prose_without_json_is_a_syntax_error() {
        let err = validator().parse("I could not find anything.").unwrap_err();
        assert!(err.is_parse_error());

        let err = validator().parse("{\"stars\": 4, \"comment\": }").unwrap_err();
        assert!(err.is_parse_error());
    }

    #[test]
    fn tool_calls_are_not_final_answers() {
        let completion = Completion::ToolCalls {
            content: String::new(),
            calls: vec![crate::ToolCall::new("1", "search", Value::Null)],
        };
        let err = validator().validate_completion(completion).unwrap_err();
        assert_eq!(err, ValidationError::UnexpectedToolCall(vec!["search".into()]));
    }

    #[test]
    fn structured_completion_is_checked_too() {
        let completion = Completion::Structured(serde_json::json!({"stars": "five", "comment": "x"}));
        assert!(validator().validate_completion(completion).is_err());
    }
}
