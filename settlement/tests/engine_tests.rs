//! Settlement engine scenario and property tests
//!
//! All tests run against the in-memory ledger store; failure paths use its
//! armed fault points or a test-local flaky wrapper.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use ledger_store::{
    LedgerStore, MemoryLedgerStore, NewTransaction, Transaction, TransactionStatus,
    TransactionType, User, UserId,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use settlement::{
    Error, RecordingSink, ReferralBonusProcessor, SettlementConfig, SettlementEngine,
};
use std::sync::Arc;

fn user(id: i64, balance: Decimal) -> User {
    User {
        id: UserId::new(id),
        balance,
        is_blocked: false,
        referred_by: None,
        daily_withdrawal_limit: None,
        created_at: Utc::now(),
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
}

fn engine(store: Arc<MemoryLedgerStore>) -> (Arc<SettlementEngine>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let engine = Arc::new(SettlementEngine::new(
        store,
        sink.clone(),
        SettlementConfig::default(),
    ));
    (engine, sink)
}

fn txs_of_type(txs: &[Transaction], tx_type: TransactionType) -> Vec<&Transaction> {
    txs.iter().filter(|t| t.tx_type == tx_type).collect()
}

#[tokio::test]
async fn test_bonus_and_referral_cascade() {
    let store = Arc::new(MemoryLedgerStore::new());
    let a = UserId::new(1);
    let b = UserId::new(2);

    let mut user_a = user(1, dec!(1000));
    user_a.referred_by = Some(b);
    store.insert_user(user_a).await;
    store.insert_user(user(2, dec!(500))).await;

    let (engine, _) = engine(store.clone());
    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    assert!(report.is_clean());
    assert_eq!(report.users_processed, 2);

    // A: 1000 + 5% = 1050, one bonus transaction of 50
    assert_eq!(store.balance_of(a).await, Some(dec!(1050)));
    let a_txs = store.transactions_for(a).await;
    let a_bonuses = txs_of_type(&a_txs, TransactionType::Bonus);
    assert_eq!(a_bonuses.len(), 1);
    assert_eq!(a_bonuses[0].amount, dec!(50));
    assert_eq!(a_bonuses[0].status, TransactionStatus::Completed);

    // B: own bonus 25 plus 10% of A's bonus = 5 -> 530
    assert_eq!(store.balance_of(b).await, Some(dec!(530)));
    let b_txs = store.transactions_for(b).await;
    assert_eq!(txs_of_type(&b_txs, TransactionType::Bonus).len(), 1);
    let b_profit = txs_of_type(&b_txs, TransactionType::ReferralProfit);
    assert_eq!(b_profit.len(), 1);
    assert_eq!(b_profit[0].amount, dec!(5));

    assert_eq!(report.bonus_total, dec!(75));
    assert_eq!(report.referral_profit_total, dec!(5));
}

#[tokio::test]
async fn test_blocked_referrer_still_receives_profit() {
    // The referral leg is driven by the referred user's settlement; the
    // referrer's own blocked flag only suppresses their own bonus.
    let store = Arc::new(MemoryLedgerStore::new());
    let b = UserId::new(2);

    let mut user_a = user(1, dec!(1000));
    user_a.referred_by = Some(b);
    store.insert_user(user_a).await;

    let mut user_b = user(2, dec!(500));
    user_b.is_blocked = true;
    store.insert_user(user_b).await;

    let (engine, _) = engine(store.clone());
    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    assert!(report.is_clean());
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(1050)));
    // No own bonus, referral profit only: 500 + 5
    assert_eq!(store.balance_of(b).await, Some(dec!(505)));

    let b_txs = store.transactions_for(b).await;
    assert!(txs_of_type(&b_txs, TransactionType::Bonus).is_empty());
    assert_eq!(txs_of_type(&b_txs, TransactionType::ReferralProfit).len(), 1);
}

#[tokio::test]
async fn test_zero_balance_skipped() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_user(user(1, dec!(0))).await;

    let (engine, _) = engine(store.clone());
    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    assert_eq!(report.users_processed, 0);
    assert_eq!(report.users_skipped, 1);
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(0)));
    assert_eq!(store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_negative_balance_skipped() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_user(user(1, dec!(-100))).await;

    let (engine, _) = engine(store.clone());
    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    assert_eq!(report.users_processed, 0);
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(-100)));
    assert_eq!(store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_blocked_user_skipped() {
    let store = Arc::new(MemoryLedgerStore::new());
    let mut blocked = user(1, dec!(1000));
    blocked.is_blocked = true;
    store.insert_user(blocked).await;

    let (engine, _) = engine(store.clone());
    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    assert_eq!(report.users_skipped, 1);
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(1000)));
    assert_eq!(store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_empty_user_set() {
    let store = Arc::new(MemoryLedgerStore::new());
    let (engine, _) = engine(store);

    let report = engine.run_daily_settlement(run_date()).await.unwrap();
    assert_eq!(report.users_total, 0);
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_referrer_leg_failure_keeps_user_bonus() {
    let store = Arc::new(MemoryLedgerStore::new());
    let a = UserId::new(1);
    let b = UserId::new(2);

    let mut user_a = user(1, dec!(1000));
    user_a.referred_by = Some(b);
    store.insert_user(user_a).await;
    store.insert_user(user(2, dec!(500))).await;
    store.fail_balance_updates_for(b).await;

    let (engine, _) = engine(store.clone());
    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    // A's bonus committed and stays committed
    assert_eq!(store.balance_of(a).await, Some(dec!(1050)));
    // B's own bonus credit failed too (same armed fault); balance unchanged
    assert_eq!(store.balance_of(b).await, Some(dec!(500)));

    assert!(!report.is_clean());
    assert!(report.failures.iter().all(|f| f.user_id == b));

    // Re-running (next day) reprocesses A from the top, no "referral-only
    // retry": A compounds again
    store.clear_faults().await;
    let next_day = run_date().succ_opt().unwrap();
    let report = engine.run_daily_settlement(next_day).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(store.balance_of(a).await, Some(dec!(1102.50)));
}

#[tokio::test]
async fn test_bonus_transaction_failure_skips_credit() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_user(user(1, dec!(1000))).await;
    store.fail_transaction_inserts_for(UserId::new(1)).await;

    let (engine, _) = engine(store.clone());
    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    assert_eq!(report.users_processed, 0);
    assert_eq!(report.failures.len(), 1);
    // No transaction row -> no credit either
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(1000)));
    assert_eq!(store.transaction_count().await, 0);
}

#[tokio::test]
async fn test_same_day_duplicate_run_refused() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_user(user(1, dec!(1000))).await;

    let (engine, _) = engine(store.clone());
    engine.run_daily_settlement(run_date()).await.unwrap();

    let err = engine.run_daily_settlement(run_date()).await.unwrap_err();
    assert!(matches!(err, Error::AlreadySettled(d) if d == run_date()));

    // Single payout only
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(1050)));

    // The next day runs normally
    let next_day = run_date().succ_opt().unwrap();
    engine.run_daily_settlement(next_day).await.unwrap();
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(1102.50)));
}

#[tokio::test]
async fn test_forced_rerun_compounds() {
    // The computation itself is not idempotent; `run_forced` bypasses the
    // same-day guard and pays everyone again.
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_user(user(1, dec!(1000))).await;

    let (engine, _) = engine(store.clone());
    engine.run_daily_settlement(run_date()).await.unwrap();
    engine.run_forced(run_date()).await.unwrap();

    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(1102.50)));
    let txs = store.transactions_for(UserId::new(1)).await;
    assert_eq!(txs_of_type(&txs, TransactionType::Bonus).len(), 2);
}

#[tokio::test]
async fn test_notifications_are_fire_and_forget() {
    let store = Arc::new(MemoryLedgerStore::new());
    store.insert_user(user(1, dec!(1000))).await;

    let (engine, sink) = engine(store.clone());
    sink.fail_deliveries();

    let report = engine.run_daily_settlement(run_date()).await.unwrap();

    // Sink failures never touch the run
    assert!(report.is_clean());
    assert_eq!(report.users_processed, 1);
    assert_eq!(store.balance_of(UserId::new(1)).await, Some(dec!(1050)));
}

#[tokio::test]
async fn test_notifications_delivered_per_credit() {
    let store = Arc::new(MemoryLedgerStore::new());
    let b = UserId::new(2);
    let mut user_a = user(1, dec!(1000));
    user_a.referred_by = Some(b);
    store.insert_user(user_a).await;
    store.insert_user(user(2, dec!(500))).await;

    let (engine, sink) = engine(store);
    engine.run_daily_settlement(run_date()).await.unwrap();

    let notified = sink.notified().await;
    // A's bonus, B's bonus, B's referral profit
    assert_eq!(notified.len(), 3);
    assert!(notified.contains(&(UserId::new(1), dec!(50))));
    assert!(notified.contains(&(b, dec!(5))));
}

#[tokio::test]
async fn test_registration_referral_bonus_credits_both() {
    let store = Arc::new(MemoryLedgerStore::new());
    let new_user = UserId::new(10);
    let referrer = UserId::new(3);
    store.insert_user(user(10, dec!(0))).await;
    store.insert_user(user(3, dec!(200))).await;

    let processor = ReferralBonusProcessor::new(store.clone());
    processor
        .process_referral_bonus(new_user, referrer, dec!(25))
        .await
        .unwrap();

    assert_eq!(store.balance_of(new_user).await, Some(dec!(25)));
    assert_eq!(store.balance_of(referrer).await, Some(dec!(225)));

    let new_txs = store.transactions_for(new_user).await;
    assert_eq!(txs_of_type(&new_txs, TransactionType::ReferralBonus).len(), 1);
    let ref_txs = store.transactions_for(referrer).await;
    assert_eq!(txs_of_type(&ref_txs, TransactionType::ReferralBonus).len(), 1);
}

#[tokio::test]
async fn test_registration_referral_reversal_on_referrer_failure() {
    let store = Arc::new(MemoryLedgerStore::new());
    let new_user = UserId::new(10);
    let referrer = UserId::new(3);
    store.insert_user(user(10, dec!(0))).await;
    store.insert_user(user(3, dec!(200))).await;
    store.fail_balance_updates_for(referrer).await;

    let processor = ReferralBonusProcessor::new(store.clone());
    let err = processor
        .process_referral_bonus(new_user, referrer, dec!(25))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));

    // User's credit was reversed; no correction record exists
    assert_eq!(store.balance_of(new_user).await, Some(dec!(0)));
    assert_eq!(store.balance_of(referrer).await, Some(dec!(200)));
    let new_txs = store.transactions_for(new_user).await;
    assert_eq!(txs_of_type(&new_txs, TransactionType::ReferralBonus).len(), 1);
}

/// Delegating store that fails chosen balance-update calls by sequence
/// number, for ordering-sensitive failure paths the armed faults can't hit.
struct FlakyStore {
    inner: MemoryLedgerStore,
    fail_update_calls: Vec<usize>,
    update_calls: std::sync::atomic::AtomicUsize,
}

impl FlakyStore {
    fn new(inner: MemoryLedgerStore, fail_update_calls: Vec<usize>) -> Self {
        Self {
            inner,
            fail_update_calls,
            update_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn find_all_users(&self) -> ledger_store::Result<Vec<User>> {
        self.inner.find_all_users().await
    }

    async fn find_user(&self, id: UserId) -> ledger_store::Result<User> {
        self.inner.find_user(id).await
    }

    async fn update_balance_additive(
        &self,
        id: UserId,
        delta: Decimal,
    ) -> ledger_store::Result<()> {
        let call = self
            .update_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
            + 1;
        if self.fail_update_calls.contains(&call) {
            return Err(ledger_store::Error::Fault(format!(
                "balance update call #{}",
                call
            )));
        }
        self.inner.update_balance_additive(id, delta).await
    }

    async fn create_transaction(
        &self,
        tx: NewTransaction,
    ) -> ledger_store::Result<Transaction> {
        self.inner.create_transaction(tx).await
    }

    async fn withdrawals_completed_today(
        &self,
        id: UserId,
        day: NaiveDate,
    ) -> ledger_store::Result<Decimal> {
        self.inner.withdrawals_completed_today(id, day).await
    }

    async fn find_transaction(&self, id: uuid::Uuid) -> ledger_store::Result<Transaction> {
        self.inner.find_transaction(id).await
    }

    async fn set_transaction_status(
        &self,
        id: uuid::Uuid,
        status: TransactionStatus,
    ) -> ledger_store::Result<Transaction> {
        self.inner.set_transaction_status(id, status).await
    }
}

#[tokio::test]
async fn test_registration_referral_reversal_failure_is_absorbed() {
    // Call #1: user credit (ok). Call #2: referrer credit (fails).
    // Call #3: reversal of the user credit (fails) -> absorbed, the user
    // stays over-credited and the caller still gets the original error.
    let inner = MemoryLedgerStore::new();
    inner.insert_user(user(10, dec!(0))).await;
    inner.insert_user(user(3, dec!(200))).await;

    let store = Arc::new(FlakyStore::new(inner, vec![2, 3]));
    let processor = ReferralBonusProcessor::new(store.clone());

    let err = processor
        .process_referral_bonus(UserId::new(10), UserId::new(3), dec!(25))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Store(_)));

    assert_eq!(store.inner.balance_of(UserId::new(10)).await, Some(dec!(25)));
    assert_eq!(store.inner.balance_of(UserId::new(3)).await, Some(dec!(200)));
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    /// Balances in cents, small enough to keep the arithmetic readable
    fn balance_strategy() -> impl Strategy<Value = Decimal> {
        (-1_000_000i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn users_strategy() -> impl Strategy<Value = Vec<(Decimal, bool, bool)>> {
        prop::collection::vec(
            (balance_strategy(), any::<bool>(), any::<bool>()),
            0..20,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Settlement never decreases any balance, and the report totals
        /// equal the sum of the transactions it created.
        #[test]
        fn prop_settlement_never_decreases_balances(specs in users_strategy()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let store = Arc::new(MemoryLedgerStore::new());
                let mut before = Vec::new();

                for (i, (balance, blocked, referred)) in specs.iter().enumerate() {
                    let id = i as i64 + 1;
                    let mut u = user(id, *balance);
                    u.is_blocked = *blocked;
                    // Refer to the previous user, when there is one
                    if *referred && i > 0 {
                        u.referred_by = Some(UserId::new(id - 1));
                    }
                    before.push((u.id, *balance));
                    store.insert_user(u).await;
                }

                let sink = Arc::new(RecordingSink::new());
                let engine = SettlementEngine::new(
                    store.clone(),
                    sink,
                    SettlementConfig::default(),
                );
                let report = engine.run_daily_settlement(run_date()).await.unwrap();

                let mut bonus_sum = Decimal::ZERO;
                let mut profit_sum = Decimal::ZERO;
                for (id, old_balance) in &before {
                    let new_balance = store.balance_of(*id).await.unwrap();
                    prop_assert!(new_balance >= *old_balance);

                    let txs = store.transactions_for(*id).await;
                    for tx in &txs {
                        match tx.tx_type {
                            TransactionType::Bonus => bonus_sum += tx.amount,
                            TransactionType::ReferralProfit => profit_sum += tx.amount,
                            _ => {}
                        }
                    }
                    // At most one bonus per user per run
                    prop_assert!(
                        txs.iter().filter(|t| t.tx_type == TransactionType::Bonus).count() <= 1
                    );
                }

                prop_assert_eq!(report.bonus_total, bonus_sum);
                prop_assert_eq!(report.referral_profit_total, profit_sum);
                Ok(())
            })?;
        }
    }
}
