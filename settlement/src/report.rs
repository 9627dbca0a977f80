//! Per-run settlement report
//!
//! A run never aborts on a per-user error; everything a caller needs to
//! surface — counts, totals, and each failure — is aggregated here.

use chrono::NaiveDate;
use ledger_store::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate result of one settlement run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementReport {
    /// Calendar day (UTC) this run settled
    pub run_date: NaiveDate,

    /// Users examined
    pub users_total: usize,

    /// Users that received a bonus credit
    pub users_processed: usize,

    /// Users skipped by the eligibility filter (blocked or non-positive bonus)
    pub users_skipped: usize,

    /// Sum of bonuses credited
    pub bonus_total: Decimal,

    /// Sum of referral profits credited
    pub referral_profit_total: Decimal,

    /// Per-user failures, in encounter order
    pub failures: Vec<SettlementFailure>,
}

impl SettlementReport {
    /// Empty report for a run over `users_total` users
    pub fn new(run_date: NaiveDate, users_total: usize) -> Self {
        Self {
            run_date,
            users_total,
            users_processed: 0,
            users_skipped: 0,
            bonus_total: Decimal::ZERO,
            referral_profit_total: Decimal::ZERO,
            failures: Vec::new(),
        }
    }

    /// Record a failure for `user_id` at `stage`
    pub fn push_failure(&mut self, user_id: UserId, stage: FailureStage, message: impl Into<String>) {
        self.failures.push(SettlementFailure {
            user_id,
            stage,
            message: message.into(),
        });
    }

    /// True when every user settled without error
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// First failure encountered, if any
    pub fn first_failure(&self) -> Option<&SettlementFailure> {
        self.failures.first()
    }

    /// Total amount credited by this run across both transaction types
    pub fn credited_total(&self) -> Decimal {
        self.bonus_total + self.referral_profit_total
    }
}

/// One failed settlement leg
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementFailure {
    /// User whose ledger write failed (the referrer for referral legs)
    pub user_id: UserId,

    /// Which leg failed
    pub stage: FailureStage,

    /// Store error message
    pub message: String,
}

/// Settlement leg that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Inserting the user's bonus transaction
    BonusTransaction,
    /// Crediting the user's balance
    BonusCredit,
    /// Inserting the referrer's profit transaction
    ReferralTransaction,
    /// Crediting the referrer's balance
    ReferralCredit,
}
