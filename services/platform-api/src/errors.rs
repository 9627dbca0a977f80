use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Store error: {0}")]
    Store(#[from] ledger_store::Error),

    #[error("Settlement error: {0}")]
    Settlement(#[from] settlement::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Daily withdrawal limit exceeded, headroom {headroom}")]
    WithdrawalLimitExceeded { headroom: Decimal },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("User is blocked")]
    UserBlocked,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(json!({
            "error": {
                "code": status_code.as_u16(),
                "message": error_message,
                "type": self.error_type()
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Store(ledger_store::Error::UserNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(ledger_store::Error::TransactionNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(ledger_store::Error::AlreadyFinalized { .. }) => StatusCode::CONFLICT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Settlement(settlement::Error::AlreadySettled(_)) => StatusCode::CONFLICT,
            ApiError::Settlement(settlement::Error::RunInProgress) => StatusCode::CONFLICT,
            ApiError::Settlement(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::WithdrawalLimitExceeded { .. } => StatusCode::BAD_REQUEST,
            ApiError::InsufficientBalance { .. } => StatusCode::BAD_REQUEST,
            ApiError::UserBlocked => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ApiError {
    fn error_type(&self) -> &str {
        match self {
            ApiError::Store(ledger_store::Error::UserNotFound(_)) => "not_found",
            ApiError::Store(ledger_store::Error::TransactionNotFound(_)) => "not_found",
            ApiError::Store(ledger_store::Error::AlreadyFinalized { .. }) => "already_finalized",
            ApiError::Store(_) => "store_error",
            ApiError::Settlement(settlement::Error::AlreadySettled(_)) => "already_settled",
            ApiError::Settlement(settlement::Error::RunInProgress) => "run_in_progress",
            ApiError::Settlement(_) => "settlement_error",
            ApiError::Validation(_) => "validation_error",
            ApiError::WithdrawalLimitExceeded { .. } => "withdrawal_limit",
            ApiError::InsufficientBalance { .. } => "insufficient_balance",
            ApiError::UserBlocked => "user_blocked",
            ApiError::Internal(_) => "internal_error",
        }
    }
}
