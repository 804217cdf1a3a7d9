//! Billing Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, BillingError>;

/// Billing-related errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Stripe API error
    #[error("Stripe error: {0}")]
    Stripe(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from the reconciliation core
    #[error(transparent)]
    Core(#[from] genie_core::GenieError),
}

impl BillingError {
    /// Get user-friendly message
    pub fn user_message(&self) -> &str {
        match self {
            BillingError::Stripe(_) => "Payment processing failed. Please try again.",
            BillingError::Config(_) => "Service configuration error.",
            _ => "An error occurred processing your request.",
        }
    }
}
