//! Subscription Reconciliation
//!
//! Keeps `subscription_status` consistent with `subscription_end_date`
//! and with payment-provider events. Expiry here is the only
//! time-driven downgrade in the system and must run before any quota
//! decision, because the quota limit depends on the effective status.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::account::{SubscriptionStatus, UserAccount, UserId};
use crate::error::Result;
use crate::store::Datastore;

/// Paid window granted when the provider's period end is unavailable
pub const FALLBACK_PERIOD_DAYS: i64 = 30;

/// Payment-provider event, already verified and translated by the
/// billing layer. Consumed, never stored: each event is applied to at
/// most one account (matched by customer id) and then discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PaymentEvent {
    /// A subscription invoice was paid
    PaymentSucceeded {
        customer_id: String,
        subscription_id: Option<String>,
    },

    /// A subscription invoice could not be collected
    PaymentFailed { customer_id: String },

    /// The subscription was cancelled at the provider
    SubscriptionDeleted { customer_id: String },
}

impl PaymentEvent {
    /// Customer the event is addressed to
    pub fn customer_id(&self) -> &str {
        match self {
            PaymentEvent::PaymentSucceeded { customer_id, .. }
            | PaymentEvent::PaymentFailed { customer_id }
            | PaymentEvent::SubscriptionDeleted { customer_id } => customer_id,
        }
    }
}

/// What applying an event did
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventOutcome {
    /// The matched account was updated
    Applied { user_id: UserId },

    /// No account carries this customer id; the provider may send
    /// events for test or foreign customers, so this is not an error
    Ignored,
}

/// Secondary billing lookup: resolve a subscription's current period
/// end. Implemented by the Stripe client in `genie-billing`.
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    async fn period_end(&self, subscription_id: &str) -> Result<DateTime<Utc>>;
}

/// Downgrade a lapsed paid account. Paid with an end date in the past
/// becomes free with the end date cleared; everything else is left
/// untouched. Returns the effective status either way.
pub fn reconcile_expiry(account: &mut UserAccount, now: DateTime<Utc>) -> SubscriptionStatus {
    if account.subscription_status == SubscriptionStatus::Paid {
        if let Some(end) = account.subscription_end_date {
            if now > end {
                account.subscription_status = SubscriptionStatus::Free;
                account.subscription_end_date = None;
            }
        }
    }
    account.subscription_status
}

/// Mark an account paid. `period_end` is the provider's reported period
/// end when the lookup succeeded; `None` falls back to now + 30 days so
/// a failed secondary lookup never blocks a billing update.
pub fn activate_paid(
    account: &mut UserAccount,
    period_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) {
    account.subscription_status = SubscriptionStatus::Paid;
    account.subscription_end_date =
        Some(period_end.unwrap_or_else(|| now + Duration::days(FALLBACK_PERIOD_DAYS)));
}

/// Fetch the period end for an optional subscription id, absorbing
/// lookup failures. Shared by the webhook path and checkout
/// confirmation so both apply the same fallback rule.
pub async fn resolve_period_end(
    lookup: &dyn SubscriptionLookup,
    subscription_id: Option<&str>,
) -> Option<DateTime<Utc>> {
    let id = subscription_id?;
    match lookup.period_end(id).await {
        Ok(end) => Some(end),
        Err(e) => {
            tracing::warn!(
                subscription_id = %id,
                error = %e,
                "Period-end lookup failed, falling back to default window"
            );
            None
        }
    }
}

/// Apply one payment-provider event to the account it addresses.
///
/// All branches are idempotent: each sets fields to values, so
/// reapplying the same event yields the same end state. An unknown
/// customer id is an `Ignored` outcome, not an error.
pub async fn apply_payment_event(
    store: &dyn Datastore,
    lookup: &dyn SubscriptionLookup,
    event: PaymentEvent,
    now: DateTime<Utc>,
) -> Result<EventOutcome> {
    let Some(account) = store.account_by_customer(event.customer_id())? else {
        tracing::warn!(
            customer_id = %event.customer_id(),
            "Payment event for unknown customer, ignoring"
        );
        return Ok(EventOutcome::Ignored);
    };

    let updated = match &event {
        PaymentEvent::PaymentSucceeded {
            subscription_id, ..
        } => {
            let period_end = resolve_period_end(lookup, subscription_id.as_deref()).await;
            store.update_account(&account.id, &mut |a| activate_paid(a, period_end, now))?
        }
        PaymentEvent::PaymentFailed { .. } | PaymentEvent::SubscriptionDeleted { .. } => store
            .update_account(&account.id, &mut |a| {
                a.subscription_status = SubscriptionStatus::Free;
                a.subscription_end_date = None;
            })?,
    };

    tracing::info!(
        user_id = %updated.id,
        status = updated.subscription_status.as_str(),
        "Applied payment event"
    );

    Ok(EventOutcome::Applied {
        user_id: updated.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserId;
    use crate::error::GenieError;
    use crate::store::MemoryDatastore;
    use chrono::TimeZone;

    struct FixedLookup(Option<DateTime<Utc>>);

    #[async_trait]
    impl SubscriptionLookup for FixedLookup {
        async fn period_end(&self, _subscription_id: &str) -> Result<DateTime<Utc>> {
            self.0
                .ok_or_else(|| GenieError::PaymentLookup("provider unreachable".into()))
        }
    }

    fn instant(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()
    }

    fn paid_account(id: &str, customer: &str, end: Option<DateTime<Utc>>) -> UserAccount {
        let mut acc = UserAccount::new(UserId::from_string(id), instant(1));
        acc.stripe_customer_id = Some(customer.into());
        acc.subscription_status = SubscriptionStatus::Paid;
        acc.subscription_end_date = end;
        acc
    }

    #[test]
    fn test_expiry_downgrades_lapsed_paid() {
        let mut acc = paid_account("user-1", "cus_1", Some(instant(10)));

        let status = reconcile_expiry(&mut acc, instant(11));
        assert_eq!(status, SubscriptionStatus::Free);
        assert!(acc.subscription_end_date.is_none());

        // Repeat with a later now is a no-op
        let status = reconcile_expiry(&mut acc, instant(20));
        assert_eq!(status, SubscriptionStatus::Free);
    }

    #[test]
    fn test_expiry_leaves_current_and_unbounded_paid() {
        let mut current = paid_account("user-1", "cus_1", Some(instant(20)));
        assert_eq!(
            reconcile_expiry(&mut current, instant(10)),
            SubscriptionStatus::Paid
        );
        assert_eq!(current.subscription_end_date, Some(instant(20)));

        // None end date means unbounded, never expires
        let mut lifetime = paid_account("user-2", "cus_2", None);
        assert_eq!(
            reconcile_expiry(&mut lifetime, instant(30)),
            SubscriptionStatus::Paid
        );
    }

    #[test]
    fn test_activate_paid_prefers_reported_period_end() {
        let now = instant(1);
        let mut acc = UserAccount::new(UserId::from_string("user-1"), now);

        activate_paid(&mut acc, Some(instant(15)), now);
        assert_eq!(acc.subscription_status, SubscriptionStatus::Paid);
        assert_eq!(acc.subscription_end_date, Some(instant(15)));

        activate_paid(&mut acc, None, now);
        assert_eq!(
            acc.subscription_end_date,
            Some(now + Duration::days(FALLBACK_PERIOD_DAYS))
        );
    }

    #[tokio::test]
    async fn test_payment_succeeded_uses_lookup_result() {
        let store = MemoryDatastore::new();
        let mut acc = paid_account("user-1", "cus_1", None);
        acc.subscription_status = SubscriptionStatus::Free;
        store.put_account(&acc).unwrap();

        let event = PaymentEvent::PaymentSucceeded {
            customer_id: "cus_1".into(),
            subscription_id: Some("sub_1".into()),
        };
        let outcome = apply_payment_event(
            &store,
            &FixedLookup(Some(instant(25))),
            event.clone(),
            instant(1),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            EventOutcome::Applied {
                user_id: acc.id.clone()
            }
        );
        let loaded = store.account(&acc.id).unwrap().unwrap();
        assert_eq!(loaded.subscription_status, SubscriptionStatus::Paid);
        assert_eq!(loaded.subscription_end_date, Some(instant(25)));

        // Reapplying the same event lands on the same state
        apply_payment_event(&store, &FixedLookup(Some(instant(25))), event, instant(1))
            .await
            .unwrap();
        let again = store.account(&acc.id).unwrap().unwrap();
        assert_eq!(again.subscription_status, SubscriptionStatus::Paid);
        assert_eq!(again.subscription_end_date, Some(instant(25)));
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_default_window() {
        let store = MemoryDatastore::new();
        let mut acc = paid_account("user-1", "cus_1", None);
        acc.subscription_status = SubscriptionStatus::Free;
        store.put_account(&acc).unwrap();

        let now = instant(1);
        apply_payment_event(
            &store,
            &FixedLookup(None),
            PaymentEvent::PaymentSucceeded {
                customer_id: "cus_1".into(),
                subscription_id: Some("sub_1".into()),
            },
            now,
        )
        .await
        .unwrap();

        let loaded = store.account(&acc.id).unwrap().unwrap();
        assert_eq!(loaded.subscription_status, SubscriptionStatus::Paid);
        assert_eq!(
            loaded.subscription_end_date,
            Some(now + Duration::days(FALLBACK_PERIOD_DAYS))
        );
    }

    #[tokio::test]
    async fn test_failure_and_deletion_reset_to_free() {
        let store = MemoryDatastore::new();
        let acc = paid_account("user-1", "cus_1", Some(instant(25)));
        store.put_account(&acc).unwrap();

        apply_payment_event(
            &store,
            &FixedLookup(None),
            PaymentEvent::PaymentFailed {
                customer_id: "cus_1".into(),
            },
            instant(2),
        )
        .await
        .unwrap();

        let loaded = store.account(&acc.id).unwrap().unwrap();
        assert_eq!(loaded.subscription_status, SubscriptionStatus::Free);
        assert!(loaded.subscription_end_date.is_none());

        // Deletion on an already-free account is a no-op end state
        apply_payment_event(
            &store,
            &FixedLookup(None),
            PaymentEvent::SubscriptionDeleted {
                customer_id: "cus_1".into(),
            },
            instant(3),
        )
        .await
        .unwrap();
        let again = store.account(&acc.id).unwrap().unwrap();
        assert_eq!(again.subscription_status, SubscriptionStatus::Free);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_ignored() {
        let store = MemoryDatastore::new();
        let acc = paid_account("user-1", "cus_1", Some(instant(25)));
        store.put_account(&acc).unwrap();

        let outcome = apply_payment_event(
            &store,
            &FixedLookup(None),
            PaymentEvent::PaymentFailed {
                customer_id: "cus_other".into(),
            },
            instant(2),
        )
        .await
        .unwrap();

        assert_eq!(outcome, EventOutcome::Ignored);
        let loaded = store.account(&acc.id).unwrap().unwrap();
        assert_eq!(loaded.subscription_status, SubscriptionStatus::Paid);
        assert_eq!(loaded.subscription_end_date, Some(instant(25)));
    }
}
