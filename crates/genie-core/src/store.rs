//! Persistence Layer
//!
//! Record CRUD for accounts plus the append-only generation log, behind
//! one trait so a SQL store can drop in later. `MemoryDatastore` is the
//! in-tree implementation used by the server and the tests.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::account::{UserAccount, UserId};
use crate::error::{GenieError, Result};
use crate::generation::GenerationRecord;

/// Storage collaborator for accounts and generation records.
///
/// `update_account` and `commit_generation` must be atomic per account
/// (a write lock here; `SELECT ... FOR UPDATE` in a SQL implementation)
/// so concurrent read-modify-writes never lose counter updates.
/// Implementations refresh `updated_at` on every account write.
pub trait Datastore: Send + Sync {
    /// Insert or replace an account record
    fn put_account(&self, account: &UserAccount) -> Result<()>;

    /// Fetch an account by user id
    fn account(&self, id: &UserId) -> Result<Option<UserAccount>>;

    /// Resolve an account by its payment customer id
    fn account_by_customer(&self, customer_id: &str) -> Result<Option<UserAccount>>;

    /// Atomic read-modify-write on one account row. Returns the updated
    /// record; a missing account is a storage error, not a no-op.
    fn update_account(
        &self,
        id: &UserId,
        apply: &mut dyn FnMut(&mut UserAccount),
    ) -> Result<UserAccount>;

    /// Apply an account mutation and append a generation record as one
    /// storage transaction (the fulfill commit: the usage increment is
    /// never observable without its record).
    fn commit_generation(
        &self,
        id: &UserId,
        record: &GenerationRecord,
        apply: &mut dyn FnMut(&mut UserAccount),
    ) -> Result<UserAccount>;

    /// Most recent generations for a user, newest first
    fn recent_generations(&self, user_id: &UserId, limit: usize) -> Result<Vec<GenerationRecord>>;
}

/// In-memory store (development and tests)
pub struct MemoryDatastore {
    accounts: RwLock<HashMap<UserId, UserAccount>>,
    by_customer: RwLock<HashMap<String, UserId>>,
    generations: RwLock<Vec<GenerationRecord>>,
}

impl Default for MemoryDatastore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            by_customer: RwLock::new(HashMap::new()),
            generations: RwLock::new(Vec::new()),
        }
    }
}

// Lock order is always accounts -> by_customer -> generations; no method
// acquires them in any other order.
impl Datastore for MemoryDatastore {
    fn put_account(&self, account: &UserAccount) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap();
        accounts.insert(account.id.clone(), account.clone());

        if let Some(customer_id) = &account.stripe_customer_id {
            let mut by_customer = self.by_customer.write().unwrap();
            by_customer.insert(customer_id.clone(), account.id.clone());
        }

        Ok(())
    }

    fn account(&self, id: &UserId) -> Result<Option<UserAccount>> {
        let accounts = self.accounts.read().unwrap();
        Ok(accounts.get(id).cloned())
    }

    fn account_by_customer(&self, customer_id: &str) -> Result<Option<UserAccount>> {
        let id = {
            let by_customer = self.by_customer.read().unwrap();
            by_customer.get(customer_id).cloned()
        };

        match id {
            Some(id) => self.account(&id),
            None => Ok(None),
        }
    }

    fn update_account(
        &self,
        id: &UserId,
        apply: &mut dyn FnMut(&mut UserAccount),
    ) -> Result<UserAccount> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| GenieError::Storage(format!("no account for user {id}")))?;

        apply(account);
        account.updated_at = Utc::now();

        if let Some(customer_id) = &account.stripe_customer_id {
            let mut by_customer = self.by_customer.write().unwrap();
            by_customer.insert(customer_id.clone(), account.id.clone());
        }

        Ok(account.clone())
    }

    fn commit_generation(
        &self,
        id: &UserId,
        record: &GenerationRecord,
        apply: &mut dyn FnMut(&mut UserAccount),
    ) -> Result<UserAccount> {
        let mut accounts = self.accounts.write().unwrap();
        let account = accounts
            .get_mut(id)
            .ok_or_else(|| GenieError::Storage(format!("no account for user {id}")))?;

        apply(account);
        account.updated_at = Utc::now();

        let mut generations = self.generations.write().unwrap();
        generations.push(record.clone());

        Ok(account.clone())
    }

    fn recent_generations(&self, user_id: &UserId, limit: usize) -> Result<Vec<GenerationRecord>> {
        let generations = self.generations.read().unwrap();
        let mut result: Vec<_> = generations
            .iter()
            .filter(|g| &g.user_id == user_id)
            .cloned()
            .collect();

        // Sort by created_at descending
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(limit);

        Ok(result)
    }
}
