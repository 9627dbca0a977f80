// Prometheus metrics for the platform API
// Tracks: settlement runs, credits, withdrawal flow

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_with_registry, Counter, Encoder, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

pub struct Metrics {
    pub registry: Registry,

    // Settlement metrics
    pub settlement_runs_total: Counter,
    pub settlement_failures_total: Counter,
    pub bonuses_credited_total: Counter,
    pub bonus_amount_total: Counter,

    // Withdrawal metrics
    pub withdrawal_requests_total: Counter,
    pub withdrawal_limit_rejections_total: Counter,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let settlement_runs_total = register_counter_with_registry!(
            Opts::new("arcvest_settlement_runs_total", "Settlement runs completed"),
            registry
        )?;

        let settlement_failures_total = register_counter_with_registry!(
            Opts::new(
                "arcvest_settlement_failures_total",
                "Per-user settlement failures"
            ),
            registry
        )?;

        let bonuses_credited_total = register_counter_with_registry!(
            Opts::new("arcvest_bonuses_credited_total", "Users credited a daily bonus"),
            registry
        )?;

        let bonus_amount_total = register_counter_with_registry!(
            Opts::new(
                "arcvest_bonus_amount_total",
                "Total amount credited by settlement runs"
            ),
            registry
        )?;

        let withdrawal_requests_total = register_counter_with_registry!(
            Opts::new(
                "arcvest_withdrawal_requests_total",
                "Withdrawal requests accepted"
            ),
            registry
        )?;

        let withdrawal_limit_rejections_total = register_counter_with_registry!(
            Opts::new(
                "arcvest_withdrawal_limit_rejections_total",
                "Withdrawals refused by the daily limit"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            settlement_runs_total,
            settlement_failures_total,
            bonuses_credited_total,
            bonus_amount_total,
            withdrawal_requests_total,
            withdrawal_limit_rejections_total,
        })
    }

    /// Export all metrics in Prometheus text format
    pub fn export(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

// Global metrics instance
pub static METRICS: Lazy<Arc<Metrics>> =
    Lazy::new(|| Arc::new(Metrics::new().expect("Failed to initialize metrics")));
