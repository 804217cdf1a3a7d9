//! Quota Tracking
//!
//! Keeps the per-user daily counter honest and answers how much
//! allowance is left. "Today" is always passed in by the caller; these
//! functions never read the clock, which keeps every property fixable
//! in tests.

use chrono::NaiveDate;

use crate::account::{SubscriptionStatus, UserAccount};

/// Free-tier generations permitted per calendar day
pub const FREE_DAILY_LIMIT: u32 = 1;

/// Remaining allowance for the current day
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemainingQuota {
    /// Paid tier: no limit (a variant, not a large number)
    Unlimited,

    /// Free tier: generations left today
    Remaining(u32),
}

impl RemainingQuota {
    /// Whether one more generation may proceed
    pub fn allows(&self) -> bool {
        !matches!(self, RemainingQuota::Remaining(0))
    }

    /// Numeric view for API responses; `None` means unlimited
    pub fn as_count(&self) -> Option<u32> {
        match self {
            RemainingQuota::Unlimited => None,
            RemainingQuota::Remaining(n) => Some(*n),
        }
    }
}

/// Roll the daily counter over if the stored day is not `today`.
/// Idempotent: a second call with the same `today` changes nothing.
pub fn normalize_for_today(account: &mut UserAccount, today: NaiveDate) {
    if account.last_generation_date != Some(today) {
        account.generations_today = 0;
        account.last_generation_date = Some(today);
    }
}

/// Remaining allowance for an account whose counter has already been
/// normalized for today.
pub fn remaining_quota(account: &UserAccount) -> RemainingQuota {
    match account.subscription_status {
        SubscriptionStatus::Paid => RemainingQuota::Unlimited,
        SubscriptionStatus::Free => RemainingQuota::Remaining(
            FREE_DAILY_LIMIT.saturating_sub(account.generations_today),
        ),
    }
}

/// Count one successful generation. This is the effect half of an
/// admit decision: the caller has already normalized for today and
/// checked the remaining quota, and no limit is re-checked here.
pub fn record_usage(account: &mut UserAccount) {
    account.generations_today += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserId;
    use chrono::Utc;

    fn account() -> UserAccount {
        UserAccount::new(UserId::from_string("user-1"), Utc::now())
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    #[test]
    fn test_normalize_resets_on_new_day() {
        let mut acc = account();
        acc.generations_today = 3;
        acc.last_generation_date = Some(day(1));

        normalize_for_today(&mut acc, day(2));
        assert_eq!(acc.generations_today, 0);
        assert_eq!(acc.last_generation_date, Some(day(2)));
    }

    #[test]
    fn test_normalize_idempotent_same_day() {
        let mut acc = account();
        acc.generations_today = 1;
        acc.last_generation_date = Some(day(1));

        normalize_for_today(&mut acc, day(1));
        let once = acc.clone();
        normalize_for_today(&mut acc, day(1));

        assert_eq!(acc.generations_today, once.generations_today);
        assert_eq!(acc.last_generation_date, once.last_generation_date);
    }

    #[test]
    fn test_free_quota_counts_down_and_clamps() {
        let mut acc = account();
        acc.last_generation_date = Some(day(1));

        assert_eq!(remaining_quota(&acc), RemainingQuota::Remaining(1));
        assert!(remaining_quota(&acc).allows());

        record_usage(&mut acc);
        assert_eq!(remaining_quota(&acc), RemainingQuota::Remaining(0));
        assert!(!remaining_quota(&acc).allows());

        // Over-count (e.g. racing requests) still clamps at zero
        record_usage(&mut acc);
        assert_eq!(remaining_quota(&acc), RemainingQuota::Remaining(0));
    }

    #[test]
    fn test_paid_is_unlimited() {
        let mut acc = account();
        acc.subscription_status = SubscriptionStatus::Paid;
        acc.generations_today = 999;

        assert_eq!(remaining_quota(&acc), RemainingQuota::Unlimited);
        assert!(remaining_quota(&acc).allows());
        assert_eq!(remaining_quota(&acc).as_count(), None);
    }
}
