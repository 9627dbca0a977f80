//! Postgres-backed ledger store
//!
//! Hand-written SQL over a `sqlx` pool. The additive balance update is a
//! single `UPDATE ... SET balance = balance + $1` statement; the row lock
//! taken by Postgres for that statement is the only concurrency control
//! balances need.

use crate::error::{Error, Result};
use crate::store::LedgerStore;
use crate::types::{NewTransaction, Transaction, TransactionStatus, User, UserId};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use uuid::Uuid;

/// Postgres implementation of [`LedgerStore`]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    /// Connect to the database
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("Connected to ledger database ({} connections max)", max_connections);

        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = day.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc();
        let end = start + chrono::Duration::days(1);
        (start, end)
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn find_all_users(&self) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.balance, u.is_blocked, u.referred_by,
                   p.daily_withdrawal_limit, u.created_at
            FROM users u
            LEFT JOIN plans p ON p.id = u.plan_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn find_user(&self, id: UserId) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.balance, u.is_blocked, u.referred_by,
                   p.daily_withdrawal_limit, u.created_at
            FROM users u
            LEFT JOIN plans p ON p.id = u.plan_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::UserNotFound(id))?;

        Ok(user)
    }

    async fn update_balance_additive(&self, id: UserId, delta: Decimal) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE users SET balance = balance + $1 WHERE id = $2
            "#,
        )
        .bind(delta)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(id));
        }

        Ok(())
    }

    async fn create_transaction(&self, tx: NewTransaction) -> Result<Transaction> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        let stored = sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (id, user_id, amount, tx_type, status, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(tx.user_id)
        .bind(tx.amount)
        .bind(tx.tx_type)
        .bind(tx.status)
        .bind(&tx.description)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn withdrawals_completed_today(&self, id: UserId, day: NaiveDate) -> Result<Decimal> {
        let (start, end) = Self::day_bounds(day);

        let total: Option<Decimal> = sqlx::query_scalar(
            r#"
            SELECT SUM(amount)
            FROM transactions
            WHERE user_id = $1
              AND tx_type = 'withdrawal'
              AND status = 'completed'
              AND created_at >= $2
              AND created_at < $3
            "#,
        )
        .bind(id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(total.unwrap_or(Decimal::ZERO))
    }

    async fn find_transaction(&self, id: Uuid) -> Result<Transaction> {
        let tx = sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::TransactionNotFound(id))?;

        Ok(tx)
    }

    async fn set_transaction_status(
        &self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<Transaction> {
        // Guard in SQL: only a pending record may transition
        let updated = sqlx::query_as::<_, Transaction>(
            r#"
            UPDATE transactions SET status = $1
            WHERE id = $2 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(tx) => Ok(tx),
            None => {
                let existing = self.find_transaction(id).await?;
                Err(Error::AlreadyFinalized {
                    id,
                    status: format!("{:?}", existing.status).to_lowercase(),
                })
            }
        }
    }
}
