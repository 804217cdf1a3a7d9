//! Generation Gate
//!
//! The single authorization and recording decision point for a content
//! generation request. Per request the flow is: validate the input,
//! reconcile subscription expiry then the daily counter, check the
//! remaining quota (admit/deny), and on fulfillment commit the usage
//! increment together with the new record as one storage transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::account::{UserAccount, UserId};
use crate::error::{GenieError, Result};
use crate::generation::{GenerationInput, GenerationRecord};
use crate::provider::ContentProvider;
use crate::quota;
use crate::store::Datastore;
use crate::subscription;

/// Authorization outcome for a generation request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Request may proceed; carries the validated input so `fulfill`
    /// can only be reached through `authorize`
    Admitted(GenerationInput),

    /// Request is refused; terminal for this request
    Denied(Denial),
}

/// Why a request was refused. Denials are policy outcomes, not system
/// errors, and each carries a distinct user-facing message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Denial {
    /// A required field was blank after trimming
    InvalidInput { field: &'static str },

    /// Free-tier daily allowance is used up
    QuotaExceeded,
}

impl Denial {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Denial::InvalidInput { .. } => "INVALID_INPUT",
            Denial::QuotaExceeded => "QUOTA_EXCEEDED",
        }
    }

    /// Get user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Denial::InvalidInput { field } => {
                format!("Please fill in all fields ({field} is required).")
            }
            Denial::QuotaExceeded => {
                "Daily generation limit reached. Upgrade to the paid plan for unlimited generations."
                    .into()
            }
        }
    }
}

/// Authorization + recording gate over one datastore
pub struct GenerationGate<S: Datastore> {
    store: Arc<S>,
}

impl<S: Datastore> GenerationGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Run both reconciliation steps (expiry first, then the daily
    /// counter, since quota limits depend on status) and persist the
    /// result as one atomic account update. Returns the reconciled
    /// account. Read paths (dashboard, status) call this directly.
    pub fn reconcile(&self, user_id: &UserId, now: DateTime<Utc>) -> Result<UserAccount> {
        self.store.update_account(user_id, &mut |account| {
            subscription::reconcile_expiry(account, now);
            quota::normalize_for_today(account, now.date_naive());
        })
    }

    /// Decide admit/deny for a generation request.
    ///
    /// Blank input denies before any reconciliation or store write.
    pub fn authorize(
        &self,
        user_id: &UserId,
        niche: &str,
        topic: &str,
        tone: &str,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let input = match GenerationInput::parse(niche, topic, tone) {
            Ok(input) => input,
            Err(field) => return Ok(Admission::Denied(Denial::InvalidInput { field })),
        };

        let account = self.reconcile(user_id, now)?;

        if quota::remaining_quota(&account).allows() {
            Ok(Admission::Admitted(input))
        } else {
            tracing::info!(user_id = %user_id, "Generation denied: quota exhausted");
            Ok(Admission::Denied(Denial::QuotaExceeded))
        }
    }

    /// Fulfill an admitted request: exactly one provider call (no
    /// internal retry; a failure or timeout surfaces as-is with no
    /// state mutated), then commit the usage increment and the record
    /// append as one storage transaction.
    pub async fn fulfill(
        &self,
        user_id: &UserId,
        input: GenerationInput,
        provider: &dyn ContentProvider,
        now: DateTime<Utc>,
    ) -> Result<GenerationRecord> {
        let bundle = provider.generate(&input).await?;
        bundle.check_shape().map_err(GenieError::Provider)?;

        let record = GenerationRecord::new(user_id.clone(), input, bundle, now);
        self.store
            .commit_generation(user_id, &record, &mut quota::record_usage)?;

        tracing::info!(user_id = %user_id, record_id = %record.id, "Generation fulfilled");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SubscriptionStatus;
    use crate::generation::{ContentBundle, ScheduleSlot, HASHTAG_COUNT, POST_COUNT, SCHEDULE_SLOTS};
    use crate::store::MemoryDatastore;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            let p = Self::new();
            p.fail.store(true, Ordering::SeqCst);
            p
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentProvider for CountingProvider {
        async fn generate(&self, _input: &GenerationInput) -> Result<ContentBundle> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(GenieError::Provider("canned failure".into()));
            }
            Ok(ContentBundle {
                posts: (1..=POST_COUNT).map(|i| format!("Post {i}")).collect(),
                hashtags: (1..=HASHTAG_COUNT).map(|i| format!("#tag{i}")).collect(),
                schedule: (0..SCHEDULE_SLOTS)
                    .map(|_| ScheduleSlot {
                        day: "Monday".into(),
                        time: "8:00 PM".into(),
                        post: "Post 1".into(),
                    })
                    .collect(),
            })
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn instant(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()
    }

    fn gate_with_user(id: &str) -> (GenerationGate<MemoryDatastore>, UserId) {
        let store = Arc::new(MemoryDatastore::new());
        let user = UserId::from_string(id);
        store
            .put_account(&UserAccount::new(user.clone(), instant(1)))
            .unwrap();
        (GenerationGate::new(store), user)
    }

    #[tokio::test]
    async fn test_free_tier_daily_cycle() {
        let (gate, user) = gate_with_user("user-1");
        let provider = CountingProvider::new();

        // Day 1: admit, fulfill, counter goes to 1
        let admission = gate
            .authorize(&user, "fitness", "protein", "casual", instant(1))
            .unwrap();
        let Admission::Admitted(input) = admission else {
            panic!("expected admit, got {admission:?}");
        };
        let record = gate
            .fulfill(&user, input, &provider, instant(1))
            .await
            .unwrap();
        assert_eq!(record.bundle.posts.len(), POST_COUNT);
        assert_eq!(record.bundle.hashtags.len(), HASHTAG_COUNT);
        assert_eq!(record.bundle.schedule.len(), SCHEDULE_SLOTS);

        let account = gate.reconcile(&user, instant(1)).unwrap();
        assert_eq!(account.generations_today, 1);

        // Same day: denied
        let second = gate
            .authorize(&user, "fitness", "protein", "casual", instant(1))
            .unwrap();
        assert_eq!(second, Admission::Denied(Denial::QuotaExceeded));

        // Next day: admitted again
        let next_day = gate
            .authorize(&user, "fitness", "protein", "casual", instant(2))
            .unwrap();
        assert!(matches!(next_day, Admission::Admitted(_)));
    }

    #[tokio::test]
    async fn test_paid_tier_admits_regardless_of_counter() {
        let (gate, user) = gate_with_user("user-1");
        gate.store
            .update_account(&user, &mut |a| {
                a.subscription_status = SubscriptionStatus::Paid;
                a.generations_today = 50;
                a.last_generation_date = Some(instant(1).date_naive());
            })
            .unwrap();

        let admission = gate
            .authorize(&user, "fitness", "protein", "casual", instant(1))
            .unwrap();
        assert!(matches!(admission, Admission::Admitted(_)));
    }

    #[tokio::test]
    async fn test_lapsed_paid_is_downgraded_before_quota_check() {
        let (gate, user) = gate_with_user("user-1");
        gate.store
            .update_account(&user, &mut |a| {
                a.subscription_status = SubscriptionStatus::Paid;
                a.subscription_end_date = Some(instant(1));
                a.generations_today = 1;
                a.last_generation_date = Some(instant(5).date_naive());
            })
            .unwrap();

        // Past the end date and already at the free limit for today
        let admission = gate
            .authorize(&user, "fitness", "protein", "casual", instant(5))
            .unwrap();
        assert_eq!(admission, Admission::Denied(Denial::QuotaExceeded));

        let account = gate.store.account(&user).unwrap().unwrap();
        assert_eq!(account.subscription_status, SubscriptionStatus::Free);
        assert!(account.subscription_end_date.is_none());
    }

    #[tokio::test]
    async fn test_blank_input_denied_before_any_work() {
        let (gate, user) = gate_with_user("user-1");
        gate.store
            .update_account(&user, &mut |a| {
                a.last_generation_date = Some(instant(1).date_naive());
            })
            .unwrap();
        let before = gate.store.account(&user).unwrap().unwrap();

        let admission = gate
            .authorize(&user, "fitness", "   ", "casual", instant(2))
            .unwrap();
        assert_eq!(
            admission,
            Admission::Denied(Denial::InvalidInput { field: "topic" })
        );

        // No reconciliation ran: the stored day was not rolled over
        let after = gate.store.account(&user).unwrap().unwrap();
        assert_eq!(after.last_generation_date, before.last_generation_date);
        assert_eq!(gate.store.recent_generations(&user, 10).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_trimmed_input_flows_through() {
        let (gate, user) = gate_with_user("user-1");
        let provider = CountingProvider::new();

        let admission = gate
            .authorize(&user, "  fitness  ", " protein", "casual ", instant(1))
            .unwrap();
        let Admission::Admitted(input) = admission else {
            panic!("expected admit");
        };
        assert_eq!(input.niche, "fitness");

        let record = gate
            .fulfill(&user, input, &provider, instant(1))
            .await
            .unwrap();
        assert_eq!(record.input.topic, "protein");
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_no_state_behind() {
        let (gate, user) = gate_with_user("user-1");
        let provider = CountingProvider::failing();

        let Admission::Admitted(input) = gate
            .authorize(&user, "fitness", "protein", "casual", instant(1))
            .unwrap()
        else {
            panic!("expected admit");
        };

        let err = gate
            .fulfill(&user, input, &provider, instant(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GenieError::Provider(_)));
        assert_eq!(provider.calls(), 1);

        // Usage was not incremented and no record was written
        let account = gate.store.account(&user).unwrap().unwrap();
        assert_eq!(account.generations_today, 0);
        assert_eq!(gate.store.recent_generations(&user, 10).unwrap().len(), 0);
    }
}
