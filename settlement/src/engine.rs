//! The settlement engine
//!
//! One run credits every eligible user their daily bonus, then pays the
//! referrer a cut of that bonus. All balance mutations go through the
//! store's additive update; the engine never rolls back what an earlier
//! user already committed.

use crate::{
    config::SettlementConfig,
    notify::NotificationSink,
    report::{FailureStage, SettlementReport},
    Error, Result,
};
use chrono::NaiveDate;
use ledger_store::{LedgerStore, NewTransaction, TransactionType, User};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Why a user was passed over by a settlement run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility {
    /// Credit `bonus`
    Eligible {
        /// Computed bonus amount
        bonus: Decimal,
    },
    /// Blocked users never settle
    Blocked,
    /// Bonus computed to zero or below (zero or negative balance)
    NonPositiveBonus,
}

/// Daily bonus for a balance at a percentage
pub fn daily_bonus(balance: Decimal, percentage: Decimal) -> Decimal {
    balance * percentage / Decimal::from(100)
}

/// Apply the eligibility filter to one user
pub fn eligibility(user: &User, percentage: Decimal) -> Eligibility {
    if user.is_blocked {
        return Eligibility::Blocked;
    }
    let bonus = daily_bonus(user.balance, percentage);
    if bonus <= Decimal::ZERO {
        return Eligibility::NonPositiveBonus;
    }
    Eligibility::Eligible { bonus }
}

/// Settlement engine
pub struct SettlementEngine {
    /// Ledger store
    store: Arc<dyn LedgerStore>,

    /// Bonus notification sink
    sink: Arc<dyn NotificationSink>,

    /// Shared configuration (reloadable)
    config: Arc<RwLock<SettlementConfig>>,

    /// Serializes runs; a second concurrent caller is refused
    run_guard: Mutex<()>,

    /// Last day a run completed; the same-day duplicate guard
    last_settled: RwLock<Option<NaiveDate>>,
}

impl SettlementEngine {
    /// Create a new engine
    pub fn new(
        store: Arc<dyn LedgerStore>,
        sink: Arc<dyn NotificationSink>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            store,
            sink,
            config: Arc::new(RwLock::new(config)),
            run_guard: Mutex::new(()),
            last_settled: RwLock::new(None),
        }
    }

    /// Shared configuration handle
    pub fn config(&self) -> Arc<RwLock<SettlementConfig>> {
        self.config.clone()
    }

    /// Replace the configuration in place
    pub async fn update_config(&self, new_config: SettlementConfig) -> Result<()> {
        new_config.validate()?;
        *self.config.write().await = new_config;
        tracing::info!("Settlement configuration updated");
        Ok(())
    }

    /// Day of the most recent completed run
    pub async fn last_settled_date(&self) -> Option<NaiveDate> {
        *self.last_settled.read().await
    }

    /// Run the daily settlement for `run_date`
    ///
    /// Refused with [`Error::AlreadySettled`] when a run for `run_date`
    /// already completed, and with [`Error::RunInProgress`] when another
    /// run holds the guard.
    pub async fn run_daily_settlement(&self, run_date: NaiveDate) -> Result<SettlementReport> {
        self.run(run_date, false).await
    }

    /// Run for `run_date` even if that day already settled
    ///
    /// Admin escape hatch. The underlying computation is not idempotent:
    /// a forced same-day re-run credits everyone again.
    pub async fn run_forced(&self, run_date: NaiveDate) -> Result<SettlementReport> {
        self.run(run_date, true).await
    }

    async fn run(&self, run_date: NaiveDate, forced: bool) -> Result<SettlementReport> {
        let _guard = self.run_guard.try_lock().map_err(|_| Error::RunInProgress)?;

        if !forced {
            if let Some(last) = *self.last_settled.read().await {
                if last == run_date {
                    return Err(Error::AlreadySettled(run_date));
                }
            }
        }

        let (bonus_pct, referral_pct) = {
            let config = self.config.read().await;
            (
                config.daily_bonus_percentage,
                config.referral_profit_percentage,
            )
        };

        tracing::info!(
            "Starting settlement run for {} (bonus {}%, referral profit {}%)",
            run_date,
            bonus_pct,
            referral_pct
        );

        // Failing to even read the user set is a run-level error
        let users = self.store.find_all_users().await?;
        let mut report = SettlementReport::new(run_date, users.len());

        for user in &users {
            self.settle_user(user, bonus_pct, referral_pct, &mut report)
                .await;
        }

        *self.last_settled.write().await = Some(run_date);

        tracing::info!(
            "Settlement run complete: {}/{} users credited, {} bonus, {} referral profit, {} failures",
            report.users_processed,
            report.users_total,
            report.bonus_total,
            report.referral_profit_total,
            report.failures.len()
        );

        Ok(report)
    }

    /// Settle one user: bonus leg, then the referral cascade
    ///
    /// Store failures are recorded in the report; whatever was already
    /// committed for this user stays committed.
    async fn settle_user(
        &self,
        user: &User,
        bonus_pct: Decimal,
        referral_pct: Decimal,
        report: &mut SettlementReport,
    ) {
        let bonus = match eligibility(user, bonus_pct) {
            Eligibility::Eligible { bonus } => bonus,
            Eligibility::Blocked => {
                tracing::debug!("Skipping blocked user {}", user.id);
                report.users_skipped += 1;
                return;
            }
            Eligibility::NonPositiveBonus => {
                tracing::debug!("Skipping user {} (non-positive bonus)", user.id);
                report.users_skipped += 1;
                return;
            }
        };

        let description = format!("Daily bonus {}%", bonus_pct);
        if let Err(e) = self
            .store
            .create_transaction(NewTransaction::completed_credit(
                user.id,
                bonus,
                TransactionType::Bonus,
                description,
            ))
            .await
        {
            tracing::error!("Bonus transaction failed for user {}: {}", user.id, e);
            report.push_failure(user.id, FailureStage::BonusTransaction, e.to_string());
            return;
        }

        if let Err(e) = self.store.update_balance_additive(user.id, bonus).await {
            // The transaction row is already committed; not rolled back
            tracing::error!("Bonus credit failed for user {}: {}", user.id, e);
            report.push_failure(user.id, FailureStage::BonusCredit, e.to_string());
            return;
        }

        report.users_processed += 1;
        report.bonus_total += bonus;

        if let Err(e) = self.sink.notify_bonus(user.id, bonus).await {
            tracing::warn!("Bonus notification failed for user {}: {}", user.id, e);
        }

        if let Some(referrer) = user.referred_by {
            self.settle_referral(user, referrer, bonus, referral_pct, report)
                .await;
        }
    }

    /// Pay the referrer their cut of `bonus`
    async fn settle_referral(
        &self,
        user: &User,
        referrer: ledger_store::UserId,
        bonus: Decimal,
        referral_pct: Decimal,
        report: &mut SettlementReport,
    ) {
        let profit = daily_bonus(bonus, referral_pct);
        if profit <= Decimal::ZERO {
            return;
        }

        let description = format!("Referral profit {}% of user {} bonus", referral_pct, user.id);
        if let Err(e) = self
            .store
            .create_transaction(NewTransaction::completed_credit(
                referrer,
                profit,
                TransactionType::ReferralProfit,
                description,
            ))
            .await
        {
            tracing::error!(
                "Referral profit transaction failed for referrer {} (user {}): {}",
                referrer,
                user.id,
                e
            );
            report.push_failure(referrer, FailureStage::ReferralTransaction, e.to_string());
            return;
        }

        if let Err(e) = self.store.update_balance_additive(referrer, profit).await {
            tracing::error!(
                "Referral profit credit failed for referrer {} (user {}): {}",
                referrer,
                user.id,
                e
            );
            report.push_failure(referrer, FailureStage::ReferralCredit, e.to_string());
            return;
        }

        report.referral_profit_total += profit;

        if let Err(e) = self.sink.notify_bonus(referrer, profit).await {
            tracing::warn!("Referral notification failed for referrer {}: {}", referrer, e);
        }
    }
}
