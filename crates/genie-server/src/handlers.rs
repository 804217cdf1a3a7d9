//! HTTP Handlers

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use genie_billing::WebhookHandler;
use genie_core::{
    gate::{Admission, Denial, GenerationGate},
    quota::remaining_quota,
    subscription::{activate_paid, resolve_period_end},
    ContentBundle, Datastore, GenerationRecord, GenieError, SubscriptionStatus,
};

use crate::auth::AuthedUser;
use crate::state::AppState;

/// Records shown on the dashboard
const RECENT_GENERATIONS: usize = 5;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub provider_connected: bool,
    pub stripe_configured: bool,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct UserStatusResponse {
    pub subscription_status: SubscriptionStatus,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub generations_today: u32,
    /// Generations left today; `null` means unlimited
    pub remaining: Option<u32>,
    pub can_generate: bool,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    #[serde(flatten)]
    pub status: UserStatusResponse,
    pub recent_generations: Vec<GenerationRecord>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub niche: String,
    pub topic: String,
    pub tone: String,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub id: Uuid,
    #[serde(flatten)]
    pub bundle: ContentBundle,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutSuccessQuery {
    pub session_id: String,
}

#[derive(Serialize)]
pub struct CheckoutSuccessResponse {
    pub activated: bool,
    pub subscription_status: SubscriptionStatus,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: GenieError) -> HandlerError {
    tracing::error!("Request failed: {}", e);
    let code = match &e {
        GenieError::Provider(_) => "PROVIDER_ERROR",
        GenieError::Storage(_) => "STORAGE_ERROR",
        _ => "INTERNAL_ERROR",
    };
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.user_message().into(),
            code: code.into(),
        }),
    )
}

fn billing_error(e: genie_billing::BillingError, code: &str) -> HandlerError {
    tracing::error!("Billing request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.user_message().into(),
            code: code.into(),
        }),
    )
}

fn payments_disabled() -> HandlerError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Payments not configured".into(),
            code: "PAYMENTS_DISABLED".into(),
        }),
    )
}

fn denial_response(denial: Denial) -> HandlerError {
    let status = match &denial {
        Denial::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        Denial::QuotaExceeded => StatusCode::TOO_MANY_REQUESTS,
    };
    (
        status,
        Json(ErrorResponse {
            error: denial.user_message(),
            code: denial.code().into(),
        }),
    )
}

fn status_fields(account: &genie_core::UserAccount) -> UserStatusResponse {
    let remaining = remaining_quota(account);
    UserStatusResponse {
        subscription_status: account.subscription_status,
        subscription_end_date: account.subscription_end_date,
        generations_today: account.generations_today,
        remaining: remaining.as_count(),
        can_generate: remaining.allows(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let provider_connected = state.provider.health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        provider_connected,
        stripe_configured: state.stripe.is_some(),
    })
}

/// Current subscription and quota state, reconciled to now
pub async fn user_status(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Json<UserStatusResponse>, HandlerError> {
    let gate = GenerationGate::new(state.store.clone());
    let account = gate.reconcile(&user.id, Utc::now()).map_err(internal_error)?;

    Ok(Json(status_fields(&account)))
}

/// Dashboard data: status fields plus the most recent generations
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthedUser,
) -> Result<Json<DashboardResponse>, HandlerError> {
    let gate = GenerationGate::new(state.store.clone());
    let account = gate.reconcile(&user.id, Utc::now()).map_err(internal_error)?;

    let recent_generations = state
        .store
        .recent_generations(&user.id, RECENT_GENERATIONS)
        .map_err(internal_error)?;

    Ok(Json(DashboardResponse {
        status: status_fields(&account),
        recent_generations,
    }))
}

/// Generate a content bundle: authorize through the gate, call the
/// provider once, persist the record
pub async fn generate(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, HandlerError> {
    let gate = GenerationGate::new(state.store.clone());
    let now = Utc::now();

    let admission = gate
        .authorize(&user.id, &payload.niche, &payload.topic, &payload.tone, now)
        .map_err(internal_error)?;

    let input = match admission {
        Admission::Admitted(input) => input,
        Admission::Denied(denial) => return Err(denial_response(denial)),
    };

    let record = gate
        .fulfill(&user.id, input, state.provider.as_ref(), now)
        .await
        .map_err(internal_error)?;

    Ok(Json(GenerateResponse {
        id: record.id,
        bundle: record.bundle,
        created_at: record.created_at,
    }))
}

/// Create a Stripe checkout session for the Pro plan, creating the
/// Stripe customer first if the account has none yet
pub async fn create_checkout(
    State(state): State<AppState>,
    user: AuthedUser,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, HandlerError> {
    let stripe = state.stripe.as_ref().ok_or_else(payments_disabled)?;

    let account = state
        .store
        .account(&user.id)
        .map_err(internal_error)?
        .ok_or_else(|| internal_error(GenieError::Storage(format!("no account for user {}", user.id))))?;

    let customer_id = match account.stripe_customer_id {
        Some(id) => id,
        None => {
            let id = stripe
                .create_customer(account.email.as_deref(), &user.id)
                .await
                .map_err(|e| billing_error(e, "CHECKOUT_ERROR"))?;
            state
                .store
                .update_account(&user.id, &mut |a| {
                    a.stripe_customer_id = Some(id.clone());
                })
                .map_err(internal_error)?;
            id
        }
    };

    let session = stripe
        .create_checkout_session(&customer_id, &payload.success_url, &payload.cancel_url)
        .await
        .map_err(|e| billing_error(e, "CHECKOUT_ERROR"))?;

    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
        session_id: session.id,
    }))
}

/// Confirm a completed checkout and activate the paid tier. A failed
/// period-end lookup falls back to the default window; it never blocks
/// the activation.
pub async fn checkout_success(
    State(state): State<AppState>,
    user: AuthedUser,
    Query(query): Query<CheckoutSuccessQuery>,
) -> Result<Json<CheckoutSuccessResponse>, HandlerError> {
    let stripe = state.stripe.as_ref().ok_or_else(payments_disabled)?;

    let confirmation = stripe
        .confirm_checkout(&query.session_id)
        .await
        .map_err(|e| billing_error(e, "PAYMENT_VERIFICATION_ERROR"))?;

    if !confirmation.paid {
        tracing::warn!(user_id = %user.id, session_id = %query.session_id, "Checkout not paid");
        let account = state
            .store
            .account(&user.id)
            .map_err(internal_error)?
            .ok_or_else(|| internal_error(GenieError::Storage(format!("no account for user {}", user.id))))?;
        return Ok(Json(CheckoutSuccessResponse {
            activated: false,
            subscription_status: account.subscription_status,
            subscription_end_date: account.subscription_end_date,
        }));
    }

    let now = Utc::now();
    let period_end =
        resolve_period_end(stripe.as_ref(), confirmation.subscription_id.as_deref()).await;

    let account = state
        .store
        .update_account(&user.id, &mut |a| activate_paid(a, period_end, now))
        .map_err(internal_error)?;

    tracing::info!(user_id = %user.id, "Subscription activated");

    Ok(Json(CheckoutSuccessResponse {
        activated: true,
        subscription_status: account.subscription_status,
        subscription_end_date: account.subscription_end_date,
    }))
}

/// Stripe webhook intake. Signature verification is required; events
/// that fail it are rejected before any payload is trusted.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, HandlerError> {
    let stripe = state.stripe.as_ref().ok_or_else(payments_disabled)?;

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Missing Stripe signature".into(),
                    code: "MISSING_SIGNATURE".into(),
                }),
            )
        })?;

    let handler = WebhookHandler::new(state.store.clone(), stripe.clone());

    let event = handler.parse_event(&body, signature).map_err(|e| {
        tracing::warn!("Webhook signature failed: {}", e);
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid signature".into(),
                code: "INVALID_SIGNATURE".into(),
            }),
        )
    })?;

    handler
        .handle(event, Utc::now())
        .await
        .map_err(|e| billing_error(e, "WEBHOOK_ERROR"))?;

    Ok(StatusCode::OK)
}
