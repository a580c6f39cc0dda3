//! Error types for the external service adapters

use stance_agent::ToolInvocationError;

/// Failures of an actor run
#[derive(Debug, Clone, thiserror::Error)]
pub enum ActorError {
    /// The run could not be started or the service was unreachable
    #[error("failed to start actor `{actor}`: {detail}")]
    Start {
        /// Actor id, e.g. "apidojo/tweet-scraper"
        actor: String,
        /// Transport error
        detail: String,
    },

    /// The service answered with a non-success status
    #[error("actor `{actor}` run failed ({status}): {body}")]
    Rejected {
        /// Actor id
        actor: String,
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// The dataset items could not be decoded
    #[error("actor `{actor}` returned malformed items: {detail}")]
    Decode {
        /// Actor id
        actor: String,
        /// Decoder message
        detail: String,
    },

    /// Missing token or unbuildable client
    #[error("actor client configuration: {0}")]
    Config(String),
}

impl ActorError {
    /// As the error of the tool that ran the actor
    #[must_use]
    pub fn into_tool_error(self, tool_name: &str) -> ToolInvocationError {
        ToolInvocationError::new(tool_name, self.to_string())
    }
}

/// Failures of a pay-per-event charge
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// The charge request failed
    #[error("charging `{event}` failed: {detail}")]
    Charge {
        /// Event name
        event: String,
        /// Transport or status detail
        detail: String,
    },

    /// Missing token or run id
    #[error("billing configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_error_becomes_tool_error() {
        let err = ActorError::Start {
            actor: "apidojo/tweet-scraper".into(),
            detail: "connection refused".into(),
        };
        let tool_err = err.into_tool_error("scrape_x_posts");
        assert_eq!(tool_err.tool_name, "scrape_x_posts");
        assert_eq!(
            tool_err.cause,
            "failed to start actor `apidojo/tweet-scraper`: connection refused"
        );
    }
}
