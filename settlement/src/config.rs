//! Configuration for the settlement engine
//!
//! The config is a plain struct passed to the engine explicitly; at runtime
//! it is shared behind `Arc<RwLock<_>>` and reloaded through
//! [`SettlementEngine::update_config`], never through a package-level cache.
//!
//! [`SettlementEngine::update_config`]: crate::SettlementEngine::update_config

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Settlement engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// Daily bonus, percent of balance (e.g. `5` = 5%)
    pub daily_bonus_percentage: Decimal,

    /// Referral profit, percent of the referred user's bonus (e.g. `10` = 10%)
    pub referral_profit_percentage: Decimal,

    /// Scheduler settings
    pub schedule: ScheduleConfig,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            daily_bonus_percentage: Decimal::from(5),
            referral_profit_percentage: Decimal::from(10),
            schedule: ScheduleConfig::default(),
        }
    }
}

impl SettlementConfig {
    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: SettlementConfig = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load defaults, overridden by environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = SettlementConfig::default();

        if let Ok(pct) = std::env::var("SETTLEMENT_DAILY_BONUS_PCT") {
            config.daily_bonus_percentage = pct
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid bonus percentage: {}", e)))?;
        }

        if let Ok(pct) = std::env::var("SETTLEMENT_REFERRAL_PROFIT_PCT") {
            config.referral_profit_percentage = pct
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid referral percentage: {}", e)))?;
        }

        if let Ok(time) = std::env::var("SETTLEMENT_SETTLE_TIME") {
            config.schedule.settle_time = time;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that percentages and the schedule are usable
    pub fn validate(&self) -> crate::Result<()> {
        if self.daily_bonus_percentage < Decimal::ZERO {
            return Err(crate::Error::Config(
                "daily_bonus_percentage must not be negative".to_string(),
            ));
        }
        if self.referral_profit_percentage < Decimal::ZERO {
            return Err(crate::Error::Config(
                "referral_profit_percentage must not be negative".to_string(),
            ));
        }
        self.schedule.parse_settle_time()?;
        Ok(())
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Time of day (UTC, "HH:MM") the daily settlement fires
    pub settle_time: String,

    /// How often the scheduler checks the clock, in seconds
    pub check_interval_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            settle_time: "00:05".to_string(),
            check_interval_secs: 60,
        }
    }
}

impl ScheduleConfig {
    /// Parse `settle_time` into a `NaiveTime`
    pub fn parse_settle_time(&self) -> crate::Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.settle_time, "%H:%M").map_err(|e| {
            crate::Error::Config(format!("Invalid time format '{}': {}", self.settle_time, e))
        })
    }

    /// Next time the settlement is due, strictly after `now`
    pub fn next_run_time(&self, now: DateTime<Utc>) -> crate::Result<DateTime<Utc>> {
        let settle_time = self.parse_settle_time()?;

        let today = now
            .date_naive()
            .and_time(settle_time)
            .and_local_timezone(Utc)
            .single()
            .ok_or_else(|| crate::Error::Config("Invalid timezone conversion".to_string()))?;

        if now < today {
            return Ok(today);
        }

        let tomorrow = (now + Duration::days(1))
            .date_naive()
            .and_time(settle_time)
            .and_local_timezone(Utc)
            .single()
            .ok_or_else(|| crate::Error::Config("Invalid timezone conversion".to_string()))?;

        Ok(tomorrow)
    }

    /// Whether the daily settlement is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> crate::Result<bool> {
        Ok(now.time() >= self.parse_settle_time()?)
    }
}
