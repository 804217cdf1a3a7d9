//! # genie-core
//!
//! Domain model and the quota/subscription reconciliation core for
//! Post Genie.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GenerationGate                            │
//! │  ┌──────────────┐  ┌──────────────────────┐  ┌───────────┐  │
//! │  │ QuotaTracker │  │ Subscription         │  │ Datastore │  │
//! │  │  (quota.rs)  │──│ Reconciler           │──│ (store.rs)│  │
//! │  └──────────────┘  │ (subscription.rs)    │  └───────────┘  │
//! │                    └──────────────────────┘                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The gate composes the two reconciliation steps (subscription expiry,
//! then daily counter rollover) into a single admit/deny decision and
//! commits the fulfill effects atomically. The `ContentProvider` and
//! `SubscriptionLookup` traits are the seams to the external content
//! and payment providers; `Datastore` is the seam to persistence.
//!
//! Every operation takes "now"/"today" as an explicit input rather than
//! reading the clock, so tests can fix time.

pub mod account;
pub mod error;
pub mod gate;
pub mod generation;
pub mod provider;
pub mod quota;
pub mod store;
pub mod subscription;

pub use account::{SubscriptionStatus, UserAccount, UserId};
pub use error::{GenieError, Result};
pub use gate::{Admission, Denial, GenerationGate};
pub use generation::{ContentBundle, GenerationInput, GenerationRecord, ScheduleSlot};
pub use provider::ContentProvider;
pub use quota::RemainingQuota;
pub use store::{Datastore, MemoryDatastore};
pub use subscription::{EventOutcome, PaymentEvent, SubscriptionLookup};
