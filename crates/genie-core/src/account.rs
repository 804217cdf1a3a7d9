//! User Accounts
//!
//! Identity, billing link, and usage counters for a single user. The
//! account record is the only shared mutable state in the system; it is
//! mutated exclusively through the quota and subscription modules.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Opaque user identifier issued by the identity provider
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Parse from string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription tier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Free,
    Paid,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            SubscriptionStatus::Free => "free",
            SubscriptionStatus::Paid => "paid",
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, SubscriptionStatus::Paid)
    }
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        SubscriptionStatus::Free
    }
}

/// A user account record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserAccount {
    /// Stable provider-issued id
    pub id: UserId,

    /// Unique when present; used for payment customer creation
    pub email: Option<String>,

    /// Stripe customer id; set once at first checkout, never reused
    /// across users
    pub stripe_customer_id: Option<String>,

    /// Effective tier as of the last reconciliation
    pub subscription_status: SubscriptionStatus,

    /// Meaningful only while `Paid`; `None` means unbounded
    pub subscription_end_date: Option<DateTime<Utc>>,

    /// Generations performed on `last_generation_date`
    pub generations_today: u32,

    /// Calendar day the counter belongs to
    pub last_generation_date: Option<NaiveDate>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Refreshed by the store on every write
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    /// Create a fresh free-tier account
    pub fn new(id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: None,
            stripe_customer_id: None,
            subscription_status: SubscriptionStatus::Free,
            subscription_end_date: None,
            generations_today: 0,
            last_generation_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create with a known email
    pub fn with_email(id: UserId, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        let mut account = Self::new(id, now);
        account.email = Some(email.into());
        account
    }
}
