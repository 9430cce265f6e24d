//! Error types for quality assertions and instrumented invocations.
//!
//! Recording never fails. These errors come from the caller-side threshold
//! checks in [`crate::thresholds`] and from agent loops run through
//! [`crate::Invocation`].

use thiserror::Error;

/// The main error type for agent quality checks.
#[derive(Error, Debug)]
pub enum Error {
    /// The run took more turns than allowed.
    #[error("Too many turns: {turns} > {max}")]
    TooManyTurns {
        /// Turns declared at finalize.
        turns: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// The first tool call arrived later than allowed.
    #[error("First tool call on turn {turn}, expected at most {max}")]
    FirstToolTooLate {
        /// Earliest turn on which a tool was called.
        turn: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// No tool was called during the run.
    #[error("No tool was called")]
    NoToolUsed,

    /// A request declared more tools than allowed.
    #[error("Too many tool declarations: {count} > {max}")]
    TooManyToolDeclarations {
        /// Declarations sent with the request.
        count: usize,
        /// The configured ceiling.
        max: usize,
    },

    /// Nudges fired more often than allowed.
    #[error("Nudge rate {rate:.3} exceeds threshold {threshold:.3}")]
    NudgeRateExceeded {
        /// Observed rate.
        rate: f64,
        /// The configured ceiling.
        threshold: f64,
    },

    /// The measured agent loop failed.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The measured agent loop panicked.
    #[error("Agent loop panicked: {0}")]
    Panicked(String),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A generic error with a message.
    #[error("{0}")]
    Message(String),
}

impl Error {
    /// Whether this error is a threshold violation rather than a run failure.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            Error::TooManyTurns { .. }
                | Error::FirstToolTooLate { .. }
                | Error::NoToolUsed
                | Error::TooManyToolDeclarations { .. }
                | Error::NudgeRateExceeded { .. }
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Message(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Message(msg.to_string())
    }
}

/// A specialized `Result` type for agent quality operations.
pub type Result<T> = std::result::Result<T, Error>;
