//! Stripe Webhook Handling
//!
//! Verifies webhook signatures, translates Stripe events into core
//! payment events, and applies them to the matched account. Delivery
//! is at-least-once on Stripe's side; application is idempotent, so
//! replays are harmless.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use stripe::{Event, EventObject, EventType, Webhook};

use genie_core::{
    subscription::{apply_payment_event, EventOutcome, PaymentEvent},
    Datastore, UserId,
};

use crate::checkout::StripeClient;
use crate::error::{BillingError, Result};

/// What an intaken webhook did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// A matched account was updated
    Applied { user_id: UserId },

    /// Event addressed a customer this system has no record of
    Ignored,

    /// Event type this system does not act on; acknowledged as-is
    Unhandled { event_type: String },
}

/// Webhook handler
pub struct WebhookHandler<S: Datastore> {
    store: Arc<S>,
    stripe: Arc<StripeClient>,
}

impl<S: Datastore> WebhookHandler<S> {
    pub fn new(store: Arc<S>, stripe: Arc<StripeClient>) -> Self {
        Self { store, stripe }
    }

    /// Verify the webhook signature and parse the event. Events that
    /// fail verification are rejected before any payload is trusted.
    pub fn parse_event(&self, payload: &str, signature: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, self.stripe.webhook_secret())
            .map_err(|e| BillingError::WebhookSignature(e.to_string()))
    }

    /// Process one verified webhook event
    pub async fn handle(&self, event: Event, now: DateTime<Utc>) -> Result<WebhookOutcome> {
        tracing::info!(event_type = ?event.type_, "Processing Stripe webhook");

        let Some(payment_event) = Self::translate(&event)? else {
            tracing::debug!(event_type = ?event.type_, "Unhandled webhook event");
            return Ok(WebhookOutcome::Unhandled {
                event_type: format!("{:?}", event.type_),
            });
        };

        let outcome = apply_payment_event(
            self.store.as_ref(),
            self.stripe.as_ref(),
            payment_event,
            now,
        )
        .await?;

        Ok(match outcome {
            EventOutcome::Applied { user_id } => WebhookOutcome::Applied { user_id },
            EventOutcome::Ignored => WebhookOutcome::Ignored,
        })
    }

    /// Translate a Stripe event into a core payment event. Returns
    /// `None` for event types this system does not act on.
    fn translate(event: &Event) -> Result<Option<PaymentEvent>> {
        match event.type_ {
            EventType::InvoicePaymentSucceeded => {
                let EventObject::Invoice(invoice) = &event.data.object else {
                    return Err(BillingError::WebhookParse("Invalid invoice data".into()));
                };
                let customer_id = invoice
                    .customer
                    .as_ref()
                    .map(|c| c.id().to_string())
                    .ok_or_else(|| {
                        BillingError::WebhookParse("Invoice without a customer".into())
                    })?;

                Ok(Some(PaymentEvent::PaymentSucceeded {
                    customer_id,
                    subscription_id: invoice.subscription.as_ref().map(|s| s.id().to_string()),
                }))
            }

            EventType::InvoicePaymentFailed => {
                let EventObject::Invoice(invoice) = &event.data.object else {
                    return Err(BillingError::WebhookParse("Invalid invoice data".into()));
                };
                let customer_id = invoice
                    .customer
                    .as_ref()
                    .map(|c| c.id().to_string())
                    .ok_or_else(|| {
                        BillingError::WebhookParse("Invoice without a customer".into())
                    })?;

                Ok(Some(PaymentEvent::PaymentFailed { customer_id }))
            }

            EventType::CustomerSubscriptionDeleted => {
                let EventObject::Subscription(subscription) = &event.data.object else {
                    return Err(BillingError::WebhookParse("Invalid subscription data".into()));
                };

                Ok(Some(PaymentEvent::SubscriptionDeleted {
                    customer_id: subscription.customer.id().to_string(),
                }))
            }

            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genie_core::MemoryDatastore;

    #[test]
    fn test_webhook_handler_creation() {
        let store = Arc::new(MemoryDatastore::new());
        let stripe = Arc::new(StripeClient::new("sk_test_xxx", "whsec_xxx"));
        let _handler = WebhookHandler::new(store, stripe);
    }

    #[test]
    fn test_bad_signature_is_rejected() {
        let store = Arc::new(MemoryDatastore::new());
        let stripe = Arc::new(StripeClient::new("sk_test_xxx", "whsec_xxx"));
        let handler = WebhookHandler::new(store, stripe);

        let err = handler
            .parse_event("{}", "t=1,v1=deadbeef")
            .unwrap_err();
        assert!(matches!(err, BillingError::WebhookSignature(_)));
    }
}
