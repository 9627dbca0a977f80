use chrono::{DateTime, NaiveDate, Utc};
use ledger_store::{TransactionStatus, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use settlement::SettlementReport;
use uuid::Uuid;

/// Manual settlement trigger
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RunSettlementRequest {
    /// Re-run even if today already settled
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunSettlementResponse {
    pub report: SettlementReport,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettlementStatusResponse {
    pub last_settled_date: Option<NaiveDate>,
    pub next_run_at: DateTime<Utc>,
}

/// Payout destination, one of the supported payment methods
///
/// Unknown methods or missing fields fail at deserialization, before any
/// store call sees the request.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentDetails {
    BankTransfer {
        account_name: String,
        account_number: String,
        bank_name: String,
    },
    Crypto {
        network: String,
        address: String,
    },
    MobileMoney {
        provider: String,
        phone: String,
    },
}

impl PaymentDetails {
    /// Reject empty fields the serde shape can't catch
    pub fn validate(&self) -> Result<(), String> {
        let fields = match self {
            PaymentDetails::BankTransfer {
                account_name,
                account_number,
                bank_name,
            } => vec![
                ("account_name", account_name.as_str()),
                ("account_number", account_number.as_str()),
                ("bank_name", bank_name.as_str()),
            ],
            PaymentDetails::Crypto { network, address } => {
                vec![("network", network.as_str()), ("address", address.as_str())]
            }
            PaymentDetails::MobileMoney { provider, phone } => {
                vec![("provider", provider.as_str()), ("phone", phone.as_str())]
            }
        };

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WithdrawalRequest {
    pub user_id: i64,
    pub amount: Decimal,
    pub details: PaymentDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WithdrawalResponse {
    pub transaction_id: Uuid,
    pub user_id: UserId,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ReviewWithdrawalRequest {
    pub action: ReviewAction,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: UserId,
    pub balance: Decimal,
    pub daily_withdrawal_limit: Option<Decimal>,
    pub withdrawn_today: Decimal,
    pub headroom: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_details_tagged_decode() {
        let raw = r#"{"method":"bank_transfer","account_name":"Jo Pratt","account_number":"00012345","bank_name":"First Bank"}"#;
        let details: PaymentDetails = serde_json::from_str(raw).unwrap();
        assert!(matches!(details, PaymentDetails::BankTransfer { .. }));
        assert!(details.validate().is_ok());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let raw = r#"{"method":"carrier_pigeon","coop":"north"}"#;
        assert!(serde_json::from_str::<PaymentDetails>(raw).is_err());
    }

    #[test]
    fn test_empty_field_rejected() {
        let details = PaymentDetails::Crypto {
            network: "TRC20".to_string(),
            address: "  ".to_string(),
        };
        assert!(details.validate().is_err());
    }
}
