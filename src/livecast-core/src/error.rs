//! Error types for the presentation core.

use thiserror::Error;

use crate::chunk::Chunk;

#[derive(Error, Debug)]
pub enum LivecastError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Delivery failed for {chunk}: {reason}")]
    DeliveryFailed { chunk: Chunk, reason: String },

    #[error("Session initialization failed: {0}")]
    SessionInitFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LivecastError {
    /// Whether this error ends a session rather than skipping an optional step.
    pub fn is_fatal(&self) -> bool {
        match self {
            LivecastError::Unavailable(_) | LivecastError::RateLimited(_) => false,
            LivecastError::InvalidArgument(_)
            | LivecastError::DeliveryFailed { .. }
            | LivecastError::SessionInitFailed(_)
            | LivecastError::ConfigError(_) => true,
        }
    }
}

impl From<reqwest::Error> for LivecastError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            LivecastError::RateLimited(err.to_string())
        } else {
            LivecastError::Unavailable(err.to_string())
        }
    }
}

impl From<async_openai::error::OpenAIError> for LivecastError {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        use async_openai::error::OpenAIError;

        match err {
            OpenAIError::ApiError(api) if api.code.as_deref() == Some("rate_limit_exceeded") => {
                LivecastError::RateLimited(api.message)
            }
            OpenAIError::InvalidArgument(msg) => LivecastError::InvalidArgument(msg),
            other => LivecastError::Unavailable(other.to_string()),
        }
    }
}
