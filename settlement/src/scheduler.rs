//! Daily settlement scheduler
//!
//! Ticks on a fixed interval and fires the engine once the configured
//! settle time (UTC) has passed. The engine's same-day guard makes the
//! repeated post-settle-time ticks harmless: the first attempt settles,
//! every later one is refused with `AlreadySettled`.

use crate::{engine::SettlementEngine, Error, Result};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fires the daily settlement at the configured time
pub struct SettlementScheduler {
    engine: Arc<SettlementEngine>,
}

impl SettlementScheduler {
    /// Create a new scheduler around `engine`
    pub fn new(engine: Arc<SettlementEngine>) -> Self {
        Self { engine }
    }

    /// Next time the settlement is due
    pub async fn next_run_time(&self) -> Result<chrono::DateTime<Utc>> {
        let config = self.engine.config();
        let schedule = config.read().await.schedule.clone();
        schedule.next_run_time(Utc::now())
    }

    /// Run the scheduler loop; never returns under normal operation
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!("Starting settlement scheduler");

        let interval_secs = {
            let config = self.engine.config();
            let secs = config.read().await.schedule.check_interval_secs;
            secs.max(1)
        };
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));

        loop {
            interval.tick().await;

            if let Err(e) = self.tick().await {
                warn!("Scheduler tick failed: {}", e);
            }
        }
    }

    /// One scheduler check: fire the engine when the settle time has passed
    pub async fn tick(&self) -> Result<()> {
        let now = Utc::now();
        let due = {
            let config = self.engine.config();
            let schedule = config.read().await.schedule.clone();
            schedule.is_due(now)?
        };

        if !due {
            return Ok(());
        }

        match self.engine.run_daily_settlement(now.date_naive()).await {
            Ok(report) => {
                info!(
                    "Scheduled settlement for {}: {}/{} users credited, {} total",
                    report.run_date,
                    report.users_processed,
                    report.users_total,
                    report.credited_total()
                );
                for failure in &report.failures {
                    warn!(
                        "Settlement failure for user {} at {:?}: {}",
                        failure.user_id, failure.stage, failure.message
                    );
                }
                Ok(())
            }
            Err(Error::AlreadySettled(date)) => {
                debug!("Settlement for {} already ran, skipping", date);
                Ok(())
            }
            Err(Error::RunInProgress) => {
                debug!("Settlement run in progress, skipping tick");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
