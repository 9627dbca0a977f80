//! The `LedgerStore` trait — the seam between the settlement engine and
//! whatever persists balances and transactions.

use crate::error::Result;
use crate::types::{NewTransaction, Transaction, TransactionStatus, User, UserId};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Balance and transaction persistence
///
/// Implementations must make [`update_balance_additive`] a single atomic
/// increment at the store level. Concurrent writers (settlement, deposits,
/// withdrawals) rely on that to avoid lost updates; nothing in this trait
/// does read-modify-write on a cached balance.
///
/// [`update_balance_additive`]: LedgerStore::update_balance_additive
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// All users, in store order (no pagination, no ordering guarantee)
    async fn find_all_users(&self) -> Result<Vec<User>>;

    /// Single user by ID
    async fn find_user(&self, id: UserId) -> Result<User>;

    /// Atomically increment a user's balance by `delta` (may be negative)
    async fn update_balance_additive(&self, id: UserId, delta: Decimal) -> Result<()>;

    /// Append a transaction record, returning the stored row
    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction>;

    /// Sum of completed withdrawal amounts for `user` on `day` (UTC)
    async fn withdrawals_completed_today(&self, id: UserId, day: NaiveDate) -> Result<Decimal>;

    /// Single transaction by ID
    async fn find_transaction(&self, id: Uuid) -> Result<Transaction>;

    /// Transition a pending transaction's status (withdrawal review)
    ///
    /// Fails with [`Error::AlreadyFinalized`] if the record is no longer
    /// pending. Amounts are never touched.
    ///
    /// [`Error::AlreadyFinalized`]: crate::Error::AlreadyFinalized
    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<Transaction>;
}
