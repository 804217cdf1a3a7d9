//! Application State

use std::sync::Arc;

use genie_billing::StripeClient;
use genie_core::{ContentProvider, MemoryDatastore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Account and generation-record storage
    pub store: Arc<MemoryDatastore>,

    /// Content-generation provider (OpenAI-compatible, or the mock)
    pub provider: Arc<dyn ContentProvider>,

    /// Stripe client (None if billing is not configured)
    pub stripe: Option<Arc<StripeClient>>,
}
