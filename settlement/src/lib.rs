//! Arcvest Settlement Engine
//!
//! Computes and applies the platform's daily bonus and the cascading
//! referral profit, plus the money-adjacent flows around it: the
//! registration-time referral bonus and the daily withdrawal-limit check.
//!
//! # Architecture
//!
//! One settlement run:
//!
//! 1. **Guard**: refuse a same-day duplicate run; serialize concurrent runs
//! 2. **Fetch**: read the full user set from the ledger store
//! 3. **Credit**: per eligible user, record a bonus transaction and
//!    additively credit the balance
//! 4. **Cascade**: pay the referrer a percentage of the user's bonus
//! 5. **Report**: aggregate per-user failures; nothing is rolled back
//!
//! Errors never abort the pass: each failed user is recorded in the
//! [`SettlementReport`] and the run continues. Both trigger paths (daily
//! scheduler, admin endpoint) share this entry point, so the policy is
//! uniform.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ledger_store::MemoryLedgerStore;
//! use settlement::{LogSink, SettlementConfig, SettlementEngine};
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let store = Arc::new(MemoryLedgerStore::new());
//!     let engine = SettlementEngine::new(store, Arc::new(LogSink), SettlementConfig::default());
//!
//!     let report = engine
//!         .run_daily_settlement(chrono::Utc::now().date_naive())
//!         .await?;
//!     println!(
//!         "Credited {} users, {} bonus total",
//!         report.users_processed, report.bonus_total
//!     );
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod engine;
pub mod error;
pub mod limits;
pub mod notify;
pub mod referral;
pub mod report;
pub mod scheduler;

// Re-exports
pub use config::{ScheduleConfig, SettlementConfig};
pub use engine::SettlementEngine;
pub use error::{Error, Result};
pub use limits::{LimitDecision, WithdrawalLimitChecker};
pub use notify::{LogSink, NotificationSink, RecordingSink};
pub use referral::ReferralBonusProcessor;
pub use report::{FailureStage, SettlementFailure, SettlementReport};
pub use scheduler::SettlementScheduler;
