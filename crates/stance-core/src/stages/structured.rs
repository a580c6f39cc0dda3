//! Bounded re-prompting for structured answers

use crate::error::PipelineError;
use crate::phase::StageKind;
use crate::prompts;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use stance_agent::{
    Completion, CompletionRequest, LlmClient, Message, StructuredOutputValidator, ValidationError,
};

/// Extra check run after schema validation
pub(crate) type Check<'a, T> = &'a (dyn Fn(&T) -> Result<(), ValidationError> + Send + Sync);

/// Asks for a `T` until it validates or the attempts run out.
///
/// Every rejected answer is followed by a user message carrying the
/// rejection, so the model sees what to fix. All messages, including
/// rejected answers, land in the caller's transcript.
pub(crate) struct StructuredCall<'a, T> {
    llm: &'a dyn LlmClient,
    stage: StageKind,
    attempts: usize,
    validator: StructuredOutputValidator<T>,
}

impl<'a, T: DeserializeOwned + JsonSchema> StructuredCall<'a, T> {
    pub(crate) fn new(
        llm: &'a dyn LlmClient,
        stage: StageKind,
        attempts: usize,
    ) -> Result<Self, PipelineError> {
        let validator = StructuredOutputValidator::new().map_err(|source| PipelineError::Validation {
            stage,
            attempts: 0,
            source,
        })?;
        Ok(Self {
            llm,
            stage,
            attempts: attempts.max(1),
            validator,
        })
    }

    pub(crate) fn validator(&self) -> &StructuredOutputValidator<T> {
        &self.validator
    }

    /// Ask with `messages` (ending in the prompt) and validate
    pub(crate) async fn complete(
        &self,
        messages: &mut Vec<Message>,
        check: Check<'_, T>,
    ) -> Result<T, PipelineError> {
        let first = self.ask(messages).await?;
        self.settle(messages, first, check).await
    }

    /// Validate an answer already in `messages`, re-prompting on rejection
    pub(crate) async fn settle(
        &self,
        messages: &mut Vec<Message>,
        mut answer: Completion,
        check: Check<'_, T>,
    ) -> Result<T, PipelineError> {
        let mut attempt = 1;
        loop {
            let verdict = self
                .validator
                .validate_completion(answer)
                .and_then(|value| check(&value).map(|()| value));
            let error = match verdict {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.attempts {
                tracing::error!(stage = %self.stage, attempt, "Structured output rejected: {error}");
                return Err(PipelineError::Validation {
                    stage: self.stage,
                    attempts: attempt,
                    source: error,
                });
            }
            tracing::warn!(stage = %self.stage, attempt, "Structured output rejected, re-prompting: {error}");
            messages.push(Message::user(prompts::retry_feedback(&error)));
            answer = self.ask(messages).await?;
            attempt += 1;
        }
    }

    async fn ask(&self, messages: &mut Vec<Message>) -> Result<Completion, PipelineError> {
        let request = CompletionRequest::new(messages.as_slice())
            .with_output_schema(Some(self.validator.schema()));
        let completion = self.llm.complete(request).await?;
        messages.push(completion.to_message());
        Ok(completion)
    }
}

/// Accept any schema-valid answer
pub(crate) fn no_check<T>(_: &T) -> Result<(), ValidationError> {
    Ok(())
}
