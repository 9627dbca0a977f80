//! Arcvest Ledger Store
//!
//! Persists user balances and the append-only transaction log that every
//! money-moving flow on the platform writes to.
//!
//! # Design
//!
//! - **Additive updates only**: balances change through a single atomic
//!   "increment by delta" statement, never read-modify-write
//! - **Append-only transactions**: records are inserted once; only a
//!   withdrawal's status may transition, its amount never changes
//! - **Trait seam**: [`LedgerStore`] is the boundary consumed by the
//!   settlement engine; [`PgLedgerStore`] backs production,
//!   [`MemoryLedgerStore`] backs tests and local runs

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use store::LedgerStore;
pub use types::{
    NewTransaction, Transaction, TransactionStatus, TransactionType, User, UserId,
};
