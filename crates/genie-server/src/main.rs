//! Post Genie HTTP Server
//!
//! Axum-based server wiring the reconciliation core, the content
//! provider, and Stripe billing behind a small JSON API. Identity is
//! supplied upstream as headers; pages are served as static files.

mod auth;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use genie_billing::StripeClient;
use genie_content::{MockProvider, OpenAiProvider};
use genie_core::{ContentProvider, MemoryDatastore};

use crate::handlers::{
    checkout_success, create_checkout, dashboard, generate, health_check, stripe_webhook,
    user_status,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Initialize the content provider
    let provider: Arc<dyn ContentProvider> = match OpenAiProvider::from_env() {
        Ok(openai) => Arc::new(openai),
        Err(e) => {
            tracing::warn!("⚠ OpenAI not configured ({e}) - serving canned mock content");
            tracing::warn!("  Set OPENAI_API_KEY in .env for real generations");
            Arc::new(MockProvider::new())
        }
    };

    match provider.health_check().await {
        Ok(true) => tracing::info!("✓ Content provider reachable"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Content provider unreachable - generations will fail");
        }
    }

    // Initialize storage
    let store = Arc::new(MemoryDatastore::new());

    // Initialize billing
    let stripe = StripeClient::from_env().ok();

    if stripe.is_some() {
        tracing::info!("✓ Stripe configured");
    } else {
        tracing::warn!("⚠ Stripe not configured - payments disabled");
        tracing::warn!("  Set STRIPE_SECRET_KEY and STRIPE_WEBHOOK_SECRET in .env");
    }

    // Build application state
    let state = AppState {
        store,
        provider,
        stripe: stripe.map(Arc::new),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health
        .route("/health", get(health_check))
        // User API
        .route("/api/user-status", get(user_status))
        .route("/api/dashboard", get(dashboard))
        .route("/api/generate", post(generate))
        // Billing
        .route("/api/checkout", post(create_checkout))
        .route("/api/checkout/success", get(checkout_success))
        .route("/webhook/stripe", post(stripe_webhook))
        // Static pages
        .nest_service("/", tower_http::services::ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 post-genie server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               - Health check");
    tracing::info!("  GET  /api/user-status      - Subscription + quota state");
    tracing::info!("  GET  /api/dashboard        - Status + recent generations");
    tracing::info!("  POST /api/generate         - Generate a content bundle");
    tracing::info!("  POST /api/checkout         - Create Stripe checkout");
    tracing::info!("  GET  /api/checkout/success - Confirm payment");
    tracing::info!("  POST /webhook/stripe       - Stripe webhook intake");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
