//! Core types for the ledger store
//!
//! All monetary amounts are exact decimals. Transactions are append-only:
//! the only permitted mutation is a withdrawal's status transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Create new user ID
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get as i64
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform user as seen by the settlement subsystem
///
/// This is a read-model: registration, KYC, and plan purchase live in other
/// services. The settlement engine reads `balance`, `is_blocked`, and
/// `referred_by`, and writes balances only through additive updates.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Stable unique ID
    pub id: UserId,

    /// Current balance (exact decimal)
    pub balance: Decimal,

    /// Blocked users are excluded from settlement and withdrawals
    pub is_blocked: bool,

    /// Referrer, set once at registration
    pub referred_by: Option<UserId>,

    /// Daily withdrawal ceiling from the user's active plan
    /// (`None` = no plan-defined ceiling)
    pub daily_withdrawal_limit: Option<Decimal>,

    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

/// Transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Daily percentage credit on a positive balance
    Bonus,
    /// Flat signup bonus paid to both referral parties
    ReferralBonus,
    /// Referrer's cut of a referred user's daily bonus
    ReferralProfit,
    /// Customer deposit
    Deposit,
    /// Customer withdrawal
    Withdrawal,
    /// Investment plan purchase
    PlanPurchase,
}

impl TransactionType {
    /// Wire/database name
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Bonus => "bonus",
            TransactionType::ReferralBonus => "referral_bonus",
            TransactionType::ReferralProfit => "referral_profit",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::PlanPurchase => "plan_purchase",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction status
///
/// Bonus-family records are created `Completed` and never change.
/// Withdrawals are created `Pending` and transition exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting review (withdrawals only)
    Pending,
    /// Final, money moved
    Completed,
    /// Final, money refunded (withdrawals only)
    Rejected,
}

/// Immutable transaction record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    /// Record ID
    pub id: Uuid,

    /// User the record belongs to
    pub user_id: UserId,

    /// Amount (positive for credits)
    pub amount: Decimal,

    /// Transaction type
    pub tx_type: TransactionType,

    /// Status
    pub status: TransactionStatus,

    /// Human-readable description (bonus percentage, payment details, ...)
    pub description: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Transaction to append (ID and timestamp assigned by the store)
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// User the record belongs to
    pub user_id: UserId,

    /// Amount (positive for credits)
    pub amount: Decimal,

    /// Transaction type
    pub tx_type: TransactionType,

    /// Status at creation
    pub status: TransactionStatus,

    /// Human-readable description
    pub description: String,
}

impl NewTransaction {
    /// A completed credit record (bonus family)
    pub fn completed_credit(
        user_id: UserId,
        amount: Decimal,
        tx_type: TransactionType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            amount,
            tx_type,
            status: TransactionStatus::Completed,
            description: description.into(),
        }
    }

    /// A pending withdrawal record
    pub fn pending_withdrawal(
        user_id: UserId,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            amount,
            tx_type: TransactionType::Withdrawal,
            status: TransactionStatus::Pending,
            description: description.into(),
        }
    }
}
