//! Error Types

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, GenieError>;

/// Core error taxonomy
///
/// Policy denials (blank input, exhausted quota) are not errors; they
/// are `gate::Denial` outcomes. Everything here is a system failure.
#[derive(Error, Debug)]
pub enum GenieError {
    /// Content provider failed, timed out, or returned unusable content
    #[error("content provider error: {0}")]
    Provider(String),

    /// Secondary billing lookup failed; absorbed by the reconciler,
    /// never surfaced to end users
    #[error("subscription lookup failed: {0}")]
    PaymentLookup(String),

    /// Persistence layer failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl GenieError {
    /// Check if resubmitting the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenieError::Provider(_) | GenieError::PaymentLookup(_) | GenieError::Storage(_)
        )
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            GenieError::Provider(_) => "Content generation failed. Please try again.",
            GenieError::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
