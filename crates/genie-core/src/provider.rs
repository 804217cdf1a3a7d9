//! Content Provider Seam
//!
//! Common interface for content-generation backends. The gate works
//! exclusively through this trait, so the OpenAI implementation in
//! `genie-content` and the mock used in tests are interchangeable.

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::{ContentBundle, GenerationInput};

/// Strategy trait for content-generation providers.
///
/// `generate` is a single blocking request/response call with a bounded
/// timeout owned by the implementation; a timeout surfaces as
/// `GenieError::Provider`. There are no partial results: the call
/// either yields a full bundle or fails.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Generate one content bundle for a validated input triple
    async fn generate(&self, input: &GenerationInput) -> Result<ContentBundle>;

    /// Check if the provider is reachable and configured correctly
    async fn health_check(&self) -> Result<bool>;
}
