//! In-memory ledger store
//!
//! Backs unit/integration tests and local demo runs. Behavior matches the
//! Postgres store observably: additive balance updates are applied under one
//! lock acquisition, transactions are append-only, status transitions are
//! pending-only.
//!
//! Fault points can be armed per user so failure-path semantics of the
//! settlement engine (partial commits, referral-leg failures) are testable
//! without a database.

use crate::error::{Error, Result};
use crate::store::LedgerStore;
use crate::types::{NewTransaction, Transaction, TransactionStatus, User, UserId};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    users: BTreeMap<UserId, User>,
    transactions: Vec<Transaction>,
    balance_faults: HashSet<UserId>,
    insert_faults: HashSet<UserId>,
}

/// In-memory implementation of [`LedgerStore`]
#[derive(Default)]
pub struct MemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl MemoryLedgerStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub async fn insert_user(&self, user: User) {
        self.inner.write().await.users.insert(user.id, user);
    }

    /// Arm a persistent fault on balance updates for `id`
    pub async fn fail_balance_updates_for(&self, id: UserId) {
        self.inner.write().await.balance_faults.insert(id);
    }

    /// Arm a persistent fault on transaction inserts for `id`
    pub async fn fail_transaction_inserts_for(&self, id: UserId) {
        self.inner.write().await.insert_faults.insert(id);
    }

    /// Disarm all faults
    pub async fn clear_faults(&self) {
        let mut inner = self.inner.write().await;
        inner.balance_faults.clear();
        inner.insert_faults.clear();
    }

    /// Current balance, if the user exists
    pub async fn balance_of(&self, id: UserId) -> Option<Decimal> {
        self.inner.read().await.users.get(&id).map(|u| u.balance)
    }

    /// All transactions recorded for `id`, in insertion order
    pub async fn transactions_for(&self, id: UserId) -> Vec<Transaction> {
        self.inner
            .read()
            .await
            .transactions
            .iter()
            .filter(|t| t.user_id == id)
            .cloned()
            .collect()
    }

    /// Total number of recorded transactions
    pub async fn transaction_count(&self) -> usize {
        self.inner.read().await.transactions.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_all_users(&self) -> Result<Vec<User>> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn find_user(&self, id: UserId) -> Result<User> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(Error::UserNotFound(id))
    }

    async fn update_balance_additive(&self, id: UserId, delta: Decimal) -> Result<()> {
        let mut inner = self.inner.write().await;

        if inner.balance_faults.contains(&id) {
            return Err(Error::Fault(format!("balance update for user {}", id)));
        }

        let user = inner.users.get_mut(&id).ok_or(Error::UserNotFound(id))?;
        user.balance += delta;
        Ok(())
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
        let mut inner = self.inner.write().await;

        if inner.insert_faults.contains(&tx.user_id) {
            return Err(Error::Fault(format!(
                "transaction insert for user {}",
                tx.user_id
            )));
        }

        let stored = Transaction {
            id: Uuid::new_v4(),
            user_id: tx.user_id,
            amount: tx.amount,
            tx_type: tx.tx_type,
            status: tx.status,
            description: tx.description,
            created_at: Utc::now(),
        };
        inner.transactions.push(stored.clone());
        Ok(stored)
    }

    async fn withdrawals_completed_today(&self, id: UserId, day: NaiveDate) -> Result<Decimal> {
        use crate::types::TransactionType;

        let inner = self.inner.read().await;
        let total = inner
            .transactions
            .iter()
            .filter(|t| {
                t.user_id == id
                    && t.tx_type == TransactionType::Withdrawal
                    && t.status == TransactionStatus::Completed
                    && t.created_at.date_naive() == day
            })
            .map(|t| t.amount)
            .sum();
        Ok(total)
    }

    async fn find_transaction(&self, id: Uuid) -> Result<Transaction> {
        self.inner
            .read()
            .await
            .transactions
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or(Error::TransactionNotFound(id))
    }

    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<Transaction> {
        let mut inner = self.inner.write().await;
        let tx = inner
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(Error::TransactionNotFound(id))?;

        if tx.status != TransactionStatus::Pending {
            return Err(Error::AlreadyFinalized {
                id,
                status: format!("{:?}", tx.status).to_lowercase(),
            });
        }

        tx.status = status;
        Ok(tx.clone())
    }
}
