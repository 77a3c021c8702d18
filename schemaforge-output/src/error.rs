//! Error types for structured output generation.

use std::time::Duration;

use schemaforge_schema::{GenerateError, ValidationErrors};
use thiserror::Error;

/// Errors reported by a [`CompletionModel`](crate::CompletionModel).
#[derive(Debug, Error)]
pub enum ModelError {
    /// The request could not be completed.
    #[error("Request failed: {0}")]
    Request(String),

    /// Rate limited by the provider.
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The model returned no content.
    #[error("Empty response from model")]
    EmptyResponse,

    /// Request timed out inside the model.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Request was cancelled inside the model.
    #[error("Request cancelled")]
    Cancelled,

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    /// Create a request error.
    pub fn request(msg: impl Into<String>) -> Self {
        Self::Request(msg.into())
    }

    /// Create a rate limit error.
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Create a generic error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Errors from [`StructuredOutput`](crate::StructuredOutput).
#[derive(Debug, Error)]
pub enum OutputError {
    /// The model call failed. Never retried.
    #[error("Model request failed: {0}")]
    Model(#[from] ModelError),

    /// The response did not decode or did not match the schema.
    #[error("Output failed validation: {errors}")]
    Validation {
        /// Every violation found.
        errors: ValidationErrors,
        /// The raw model response.
        raw: String,
    },

    /// The caller cancelled the request.
    #[error("Structured output request cancelled")]
    Cancelled,

    /// The request exceeded the configured timeout.
    #[error("Structured output request timed out after {0:?}")]
    Timeout(Duration),

    /// No schema could be generated for the output type.
    #[error("Schema generation failed: {0}")]
    Schema(#[from] GenerateError),

    /// JSON encoding failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OutputError {
    /// Create a validation error.
    pub fn validation(errors: ValidationErrors, raw: impl Into<String>) -> Self {
        Self::Validation {
            errors,
            raw: raw.into(),
        }
    }

    /// The violations, if this is a validation error.
    #[must_use]
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }

    /// The raw model response, if one was received.
    #[must_use]
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::Validation { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Whether the caller cancelled or the deadline passed.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_schema::ValidationError;

    #[test]
    fn test_model_error_display() {
        assert_eq!(
            ModelError::request("connection reset").to_string(),
            "Request failed: connection reset"
        );
        assert!(ModelError::rate_limited(Some(Duration::from_secs(2)))
            .to_string()
            .contains("2s"));
    }

    #[test]
    fn test_model_error_is_wrapped_unchanged() {
        let err: OutputError = ModelError::EmptyResponse.into();
        assert!(matches!(err, OutputError::Model(ModelError::EmptyResponse)));
        assert!(err.validation_errors().is_none());
    }

    #[test]
    fn test_validation_error_accessors() {
        let errors: ValidationErrors = vec![ValidationError::new("score", "too big")].into();
        let err = OutputError::validation(errors, r#"{"score": 1000}"#);
        assert_eq!(err.validation_errors().map(|e| e.len()), Some(1));
        assert_eq!(err.raw_response(), Some(r#"{"score": 1000}"#));
        assert!(err.to_string().contains("score: too big"));
        assert!(!err.is_interrupted());
    }

    #[test]
    fn test_interrupted() {
        assert!(OutputError::Cancelled.is_interrupted());
        assert!(OutputError::Timeout(Duration::from_millis(5)).is_interrupted());
    }
}
