//! Registration-time referral bonus
//!
//! A flat bonus paid once to both a new user and their referrer at signup.
//! Distinct from the daily referral-profit cascade: this one is a fixed
//! amount, not a percentage of anything.

use crate::Result;
use ledger_store::{LedgerStore, NewTransaction, TransactionType, UserId};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Pays the signup referral bonus to both parties
pub struct ReferralBonusProcessor {
    store: Arc<dyn LedgerStore>,
}

impl ReferralBonusProcessor {
    /// Create a new processor
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Credit `bonus_amount` to `user_id` and to `referrer_id`
    ///
    /// The two credits are independent additive updates. If the referrer
    /// leg fails after the user was credited, one best-effort reversal of
    /// the user's credit is attempted; no correction record is written, and
    /// a failed reversal is logged and absorbed. The original error is
    /// returned either way.
    pub async fn process_referral_bonus(
        &self,
        user_id: UserId,
        referrer_id: UserId,
        bonus_amount: Decimal,
    ) -> Result<()> {
        if bonus_amount <= Decimal::ZERO {
            tracing::debug!(
                "Skipping referral bonus of {} for user {}",
                bonus_amount,
                user_id
            );
            return Ok(());
        }

        // User leg
        self.store
            .create_transaction(NewTransaction::completed_credit(
                user_id,
                bonus_amount,
                TransactionType::ReferralBonus,
                format!("Signup referral bonus (referred by {})", referrer_id),
            ))
            .await?;
        self.store
            .update_balance_additive(user_id, bonus_amount)
            .await?;

        // Referrer leg; reverse the user's credit on failure
        let referrer_leg = async {
            self.store
                .create_transaction(NewTransaction::completed_credit(
                    referrer_id,
                    bonus_amount,
                    TransactionType::ReferralBonus,
                    format!("Signup referral bonus (referred {})", user_id),
                ))
                .await?;
            self.store
                .update_balance_additive(referrer_id, bonus_amount)
                .await?;
            Ok::<(), crate::Error>(())
        };

        if let Err(e) = referrer_leg.await {
            tracing::error!(
                "Referrer leg failed for referrer {} (user {}): {}, reversing user credit",
                referrer_id,
                user_id,
                e
            );
            if let Err(rev) = self
                .store
                .update_balance_additive(user_id, -bonus_amount)
                .await
            {
                // Inconsistency absorbed; the balance stays over-credited
                tracing::error!(
                    "Reversal of {} for user {} failed: {}",
                    bonus_amount,
                    user_id,
                    rev
                );
            }
            return Err(e);
        }

        tracing::info!(
            "Signup referral bonus {} paid to user {} and referrer {}",
            bonus_amount,
            user_id,
            referrer_id
        );

        Ok(())
    }
}
