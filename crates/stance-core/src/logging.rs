//! Tracing subscriber setup for the binary
//!
//! Logs go to stderr so stdout carries only the report. `RUST_LOG`
//! overrides the default directives.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const INFO_DIRECTIVES: &str = "warn,stance_core=info,stance_agent=info,stance_tools=info";
const DEBUG_DIRECTIVES: &str =
    "info,stance_core=debug,stance_agent=debug,stance_tools=debug,stance_schema=debug";

/// Filter from `RUST_LOG`, or the defaults for the verbosity
#[must_use]
pub fn filter(debug: bool) -> EnvFilter {
    let default = if debug { DEBUG_DIRECTIVES } else { INFO_DIRECTIVES };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber, human-readable or one JSON object per line
///
/// # Errors
/// When a global subscriber is already set.
pub fn init(debug: bool, json: bool) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(filter(debug));
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    }
}
