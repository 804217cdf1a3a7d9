//! Stripe Checkout Integration
//!
//! Customer creation, the hosted checkout session for the Pro plan,
//! checkout confirmation, and the subscription period-end lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionMode,
    CheckoutSessionPaymentStatus, Client, CreateCheckoutSession,
    CreateCheckoutSessionLineItems, CreateCheckoutSessionLineItemsPriceData,
    CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionLineItemsPriceDataRecurring,
    CreateCheckoutSessionLineItemsPriceDataRecurringInterval, CreateCustomer, Currency, Customer,
    Subscription,
};

use genie_core::{SubscriptionLookup, UserId};

use crate::error::{BillingError, Result};

/// Pro plan price: $9.00/month
pub const PRO_PLAN_CENTS: i64 = 900;

const PRO_PLAN_NAME: &str = "Post Genie Pro";
const PRO_PLAN_DESCRIPTION: &str = "Unlimited social media content generation";

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    webhook_secret: String,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: Client::new(secret_key),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| BillingError::Config("STRIPE_SECRET_KEY not set".into()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .map_err(|_| BillingError::Config("STRIPE_WEBHOOK_SECRET not set".into()))?;

        Ok(Self::new(&secret_key, &webhook_secret))
    }

    /// Get the webhook secret
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }

    /// Create a Stripe customer for an account. Called once, lazily at
    /// first checkout; the metadata carries the user id so operators
    /// can trace a customer back to its account.
    pub async fn create_customer(&self, email: Option<&str>, user_id: &UserId) -> Result<String> {
        let mut params = CreateCustomer::new();
        params.email = email;

        let mut metadata = std::collections::HashMap::new();
        metadata.insert("user_id".to_string(), user_id.to_string());
        params.metadata = Some(metadata);

        let customer = Customer::create(&self.client, params)
            .await
            .map_err(|e| BillingError::Stripe(e.to_string()))?;

        tracing::info!(user_id = %user_id, customer_id = %customer.id, "Created Stripe customer");
        Ok(customer.id.to_string())
    }

    /// Create a hosted checkout session for the Pro subscription.
    ///
    /// Returns a URL to redirect the user to Stripe's checkout page.
    pub async fn create_checkout_session(
        &self,
        customer_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession> {
        let customer = customer_id
            .parse()
            .map_err(|_| BillingError::Stripe(format!("invalid customer id: {customer_id}")))?;

        let mut params = CreateCheckoutSession::new();
        params.customer = Some(customer);
        params.success_url = Some(success_url);
        params.cancel_url = Some(cancel_url);
        params.mode = Some(CheckoutSessionMode::Subscription);

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(PRO_PLAN_CENTS),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: PRO_PLAN_NAME.into(),
                    description: Some(PRO_PLAN_DESCRIPTION.into()),
                    ..Default::default()
                }),
                recurring: Some(CreateCheckoutSessionLineItemsPriceDataRecurring {
                    interval: CreateCheckoutSessionLineItemsPriceDataRecurringInterval::Month,
                    interval_count: Some(1),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(|e| BillingError::Stripe(e.to_string()))?;

        let checkout_url = session
            .url
            .ok_or_else(|| BillingError::Stripe("No checkout URL returned".into()))?;

        Ok(CheckoutSession {
            id: session.id.to_string(),
            checkout_url,
        })
    }

    /// Confirm a completed checkout by retrieving the session and
    /// checking its payment status. Returns the subscription id (when
    /// present) so the caller can resolve the paid period end.
    pub async fn confirm_checkout(&self, session_id: &str) -> Result<CheckoutConfirmation> {
        let id = session_id
            .parse()
            .map_err(|_| BillingError::Stripe(format!("invalid session id: {session_id}")))?;

        let session = StripeCheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| BillingError::Stripe(e.to_string()))?;

        Ok(CheckoutConfirmation {
            paid: session.payment_status == CheckoutSessionPaymentStatus::Paid,
            subscription_id: session.subscription.as_ref().map(|s| s.id().to_string()),
        })
    }

    async fn subscription_period_end(&self, subscription_id: &str) -> Result<DateTime<Utc>> {
        let id = subscription_id
            .parse()
            .map_err(|_| BillingError::Stripe(format!("invalid subscription id: {subscription_id}")))?;

        let subscription = Subscription::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| BillingError::Stripe(e.to_string()))?;

        DateTime::from_timestamp(subscription.current_period_end, 0).ok_or_else(|| {
            BillingError::Stripe(format!(
                "subscription {subscription_id} reported an invalid period end"
            ))
        })
    }

    /// Get the underlying Stripe client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl SubscriptionLookup for StripeClient {
    async fn period_end(&self, subscription_id: &str) -> genie_core::Result<DateTime<Utc>> {
        self.subscription_period_end(subscription_id)
            .await
            .map_err(|e| genie_core::GenieError::PaymentLookup(e.to_string()))
    }
}

/// Result of creating a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Stripe session id
    pub id: String,

    /// URL to redirect the user to
    pub checkout_url: String,
}

/// Result of confirming a checkout session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CheckoutConfirmation {
    /// Whether the session's payment completed
    pub paid: bool,

    /// Subscription created by the session, when one exists
    pub subscription_id: Option<String>,
}
