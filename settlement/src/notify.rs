//! Bonus notification sink
//!
//! Delivery is best-effort: the engine logs a sink error and moves on, it
//! never fails or blocks a settlement on one.

use async_trait::async_trait;
use ledger_store::UserId;
use rust_decimal::Decimal;
use tokio::sync::RwLock;

/// Outcome of a notification attempt
pub type NotifyResult = std::result::Result<(), NotifyError>;

/// Notification delivery error
#[derive(Debug, thiserror::Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// "You received a bonus" delivery seam
///
/// The production sink lives with the API service (email/SMS glue is out of
/// this crate's scope); [`LogSink`] is the default, [`RecordingSink`] backs
/// tests.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Tell `user_id` they were credited `amount`
    async fn notify_bonus(&self, user_id: UserId, amount: Decimal) -> NotifyResult;
}

/// Sink that only writes to the process log
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify_bonus(&self, user_id: UserId, amount: Decimal) -> NotifyResult {
        tracing::info!("Bonus notification: user {} credited {}", user_id, amount);
        Ok(())
    }
}

/// Sink that records every notification; can be armed to fail
#[derive(Debug, Default)]
pub struct RecordingSink {
    notified: RwLock<Vec<(UserId, Decimal)>>,
    fail_all: std::sync::atomic::AtomicBool,
}

impl RecordingSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail
    pub fn fail_deliveries(&self) {
        self.fail_all
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Notifications recorded so far
    pub async fn notified(&self) -> Vec<(UserId, Decimal)> {
        self.notified.read().await.clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify_bonus(&self, user_id: UserId, amount: Decimal) -> NotifyResult {
        if self.fail_all.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(NotifyError("sink down".to_string()));
        }
        self.notified.write().await.push((user_id, amount));
        Ok(())
    }
}
