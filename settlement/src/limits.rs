//! Daily withdrawal limit check
//!
//! Pure arithmetic: the caller supplies today's completed-withdrawal total
//! (from the ledger store) and the plan ceiling; nothing here mutates a
//! balance. The withdrawal-request flow deducts immediately on request,
//! refunds on rejection, and does nothing on approval.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of a limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitDecision {
    /// Whether the requested amount fits under today's ceiling
    pub allowed: bool,

    /// How much the user may still withdraw today
    /// (`None` = no plan-defined ceiling)
    pub headroom: Option<Decimal>,
}

/// Checks withdrawal requests against the plan's daily ceiling
#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawalLimitChecker;

impl WithdrawalLimitChecker {
    /// Compare `today_total + requested` against the plan ceiling
    ///
    /// `daily_limit = None` means the user's plan defines no ceiling; the
    /// request is always allowed.
    pub fn check(
        daily_limit: Option<Decimal>,
        today_total: Decimal,
        requested: Decimal,
    ) -> LimitDecision {
        let Some(limit) = daily_limit else {
            return LimitDecision {
                allowed: true,
                headroom: None,
            };
        };

        let headroom = (limit - today_total).max(Decimal::ZERO);
        LimitDecision {
            allowed: today_total + requested <= limit,
            headroom: Some(headroom),
        }
    }
}
