//! Typed errors surfaced by the library.
//!
//! Storage and CLI code mostly propagates [`anyhow::Error`] with context;
//! [`MoatError`] covers the failures callers may want to match on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoatError {
    /// Rejected user input (empty content, unknown category, bad dimension...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Required settings absent for the current environment.
    #[error("missing required environment variables for {environment}: {}", .missing.join(", "))]
    MissingSettings {
        environment: String,
        missing: Vec<String>,
    },

    /// The language model endpoint answered with a failure.
    #[error("LLM API error (HTTP {status}): {message}")]
    Llm { status: u16, message: String },

    /// A network-level failure talking to the language model.
    #[error("LLM request failed: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_lists_every_variable() {
        let err = MoatError::MissingSettings {
            environment: "production".into(),
            missing: vec!["SECRET_KEY".into(), "OPENAI_API_KEY".into()],
        };
        assert_eq!(
            err.to_string(),
            "missing required environment variables for production: SECRET_KEY, OPENAI_API_KEY"
        );
    }

    #[test]
    fn llm_error_includes_status() {
        let err = MoatError::Llm {
            status: 401,
            message: "bad key".into(),
        };
        assert!(err.to_string().contains("HTTP 401"));
    }
}
