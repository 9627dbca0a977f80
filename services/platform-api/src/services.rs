use crate::errors::{ApiError, Result};
use crate::metrics::METRICS;
use crate::models::{
    BalanceResponse, ReviewAction, SettlementStatusResponse, WithdrawalRequest,
    WithdrawalResponse,
};
use chrono::Utc;
use ledger_store::{
    LedgerStore, NewTransaction, TransactionStatus, TransactionType, UserId,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use settlement::{
    SettlementEngine, SettlementReport, SettlementScheduler, WithdrawalLimitChecker,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Admin-facing settlement operations
pub struct AdminService {
    engine: Arc<SettlementEngine>,
    scheduler: Arc<SettlementScheduler>,
}

impl AdminService {
    pub fn new(engine: Arc<SettlementEngine>, scheduler: Arc<SettlementScheduler>) -> Self {
        AdminService { engine, scheduler }
    }

    /// Trigger a settlement run for today
    pub async fn run_settlement(&self, force: bool) -> Result<SettlementReport> {
        let today = Utc::now().date_naive();

        let report = if force {
            self.engine.run_forced(today).await?
        } else {
            self.engine.run_daily_settlement(today).await?
        };

        METRICS.settlement_runs_total.inc();
        METRICS
            .bonuses_credited_total
            .inc_by(report.users_processed as f64);
        METRICS
            .settlement_failures_total
            .inc_by(report.failures.len() as f64);
        if let Some(total) = report.credited_total().to_f64() {
            METRICS.bonus_amount_total.inc_by(total);
        }

        info!(
            "Admin settlement run for {}: {}/{} users credited, {} failures",
            report.run_date,
            report.users_processed,
            report.users_total,
            report.failures.len()
        );

        Ok(report)
    }

    pub async fn status(&self) -> Result<SettlementStatusResponse> {
        Ok(SettlementStatusResponse {
            last_settled_date: self.engine.last_settled_date().await,
            next_run_at: self.scheduler.next_run_time().await?,
        })
    }
}

/// Withdrawal request/review flow
///
/// Money choreography: deduct immediately on request, refund on rejection,
/// no balance change on approval (it already happened at request time).
pub struct WithdrawalService {
    store: Arc<dyn LedgerStore>,
}

impl WithdrawalService {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        WithdrawalService { store }
    }

    pub async fn request_withdrawal(&self, request: WithdrawalRequest) -> Result<WithdrawalResponse> {
        if request.amount <= Decimal::ZERO {
            return Err(ApiError::Validation(
                "Withdrawal amount must be positive".to_string(),
            ));
        }
        request
            .details
            .validate()
            .map_err(ApiError::Validation)?;

        let user_id = UserId::new(request.user_id);
        let user = self.store.find_user(user_id).await?;

        if user.is_blocked {
            return Err(ApiError::UserBlocked);
        }

        if user.balance < request.amount {
            return Err(ApiError::InsufficientBalance {
                required: request.amount.to_string(),
                available: user.balance.to_string(),
            });
        }

        let today = Utc::now().date_naive();
        let withdrawn_today = self
            .store
            .withdrawals_completed_today(user_id, today)
            .await?;

        let decision = WithdrawalLimitChecker::check(
            user.daily_withdrawal_limit,
            withdrawn_today,
            request.amount,
        );
        if !decision.allowed {
            METRICS.withdrawal_limit_rejections_total.inc();
            return Err(ApiError::WithdrawalLimitExceeded {
                headroom: decision.headroom.unwrap_or(Decimal::ZERO),
            });
        }

        // Record first, then deduct immediately
        let description = serde_json::to_string(&request.details)?;
        let tx = self
            .store
            .create_transaction(NewTransaction::pending_withdrawal(
                user_id,
                request.amount,
                description,
            ))
            .await?;
        self.store
            .update_balance_additive(user_id, -request.amount)
            .await?;

        METRICS.withdrawal_requests_total.inc();

        info!(
            "Withdrawal {} requested: user {} amount {}",
            tx.id, user_id, request.amount
        );

        Ok(WithdrawalResponse {
            transaction_id: tx.id,
            user_id,
            amount: tx.amount,
            status: tx.status,
            created_at: tx.created_at,
        })
    }

    pub async fn review_withdrawal(
        &self,
        transaction_id: Uuid,
        action: ReviewAction,
    ) -> Result<WithdrawalResponse> {
        let tx = self.store.find_transaction(transaction_id).await?;

        if tx.tx_type != TransactionType::Withdrawal {
            return Err(ApiError::Validation(format!(
                "Transaction {} is not a withdrawal",
                transaction_id
            )));
        }

        let updated = match action {
            ReviewAction::Approve => {
                // Balance was already deducted at request time
                self.store
                    .set_transaction_status(transaction_id, TransactionStatus::Completed)
                    .await?
            }
            ReviewAction::Reject => {
                let updated = self
                    .store
                    .set_transaction_status(transaction_id, TransactionStatus::Rejected)
                    .await?;
                self.store
                    .update_balance_additive(tx.user_id, tx.amount)
                    .await?;
                updated
            }
        };

        info!(
            "Withdrawal {} reviewed: {:?} -> {:?}",
            transaction_id, action, updated.status
        );

        Ok(WithdrawalResponse {
            transaction_id: updated.id,
            user_id: updated.user_id,
            amount: updated.amount,
            status: updated.status,
            created_at: updated.created_at,
        })
    }

    pub async fn balance(&self, user_id: i64) -> Result<BalanceResponse> {
        let user_id = UserId::new(user_id);
        let user = self.store.find_user(user_id).await?;

        let today = Utc::now().date_naive();
        let withdrawn_today = self
            .store
            .withdrawals_completed_today(user_id, today)
            .await?;

        let headroom = WithdrawalLimitChecker::check(
            user.daily_withdrawal_limit,
            withdrawn_today,
            Decimal::ZERO,
        )
        .headroom;

        Ok(BalanceResponse {
            user_id,
            balance: user.balance,
            daily_withdrawal_limit: user.daily_withdrawal_limit,
            withdrawn_today,
            headroom,
        })
    }
}
