//! # genie-billing
//!
//! Stripe integration for Post Genie using the hosted-checkout flow:
//! the site redirects to Stripe's checkout page and Stripe redirects
//! back, so no payment details ever touch this service.
//!
//! `StripeClient` owns customer creation, the Pro-plan checkout
//! session, checkout confirmation, and the subscription period-end
//! lookup (it implements `genie_core::SubscriptionLookup`).
//! `WebhookHandler` verifies webhook signatures, translates Stripe
//! events into `genie_core::PaymentEvent`, and applies them through the
//! core reconciler.

mod checkout;
mod error;
mod webhook;

pub use checkout::{CheckoutConfirmation, CheckoutSession, StripeClient, PRO_PLAN_CENTS};
pub use error::{BillingError, Result};
pub use webhook::{WebhookHandler, WebhookOutcome};
