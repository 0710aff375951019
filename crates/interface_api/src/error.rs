//! API error handling
//!
//! Translates typed ledger errors into HTTP responses. Business rejections
//! keep their structured fields in the response body so a client can render
//! a precise message without parsing free text.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain_ledger::LedgerError;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    /// A typed rejection from the reconciliation engine or lifecycle guard
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Malformed request (bad header, unparsable id, invalid body shape)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Anything unexpected
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

fn ledger_parts(err: &LedgerError) -> (StatusCode, &'static str, Option<Value>) {
    match err {
        LedgerError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "not_found",
            Some(json!({ "entity": entity, "id": id })),
        ),
        LedgerError::InvalidAmount { amount } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_amount",
            Some(json!({ "amount": amount })),
        ),
        LedgerError::CreditUnavailable { entity, id, status } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "credit_unavailable",
            Some(json!({ "source": entity, "id": id, "status": status })),
        ),
        LedgerError::InsufficientBalance {
            available,
            requested,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_balance",
            Some(json!({ "available": available, "requested": requested })),
        ),
        LedgerError::ExceedsPending { pending, requested } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "exceeds_pending",
            Some(json!({ "pending": pending, "requested": requested })),
        ),
        LedgerError::CounterpartyMismatch {
            source_counterparty,
            target_counterparty,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "counterparty_mismatch",
            Some(json!({ "source": source_counterparty, "target": target_counterparty })),
        ),
        LedgerError::CurrencyMismatch {
            source_currency,
            target_currency,
        } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "currency_mismatch",
            Some(json!({ "source": source_currency.code(), "target": target_currency.code() })),
        ),
        LedgerError::InUse { utilized } => (
            StatusCode::CONFLICT,
            "in_use",
            Some(json!({ "utilized": utilized })),
        ),
        LedgerError::AlreadySettled { entity, id } => (
            StatusCode::CONFLICT,
            "already_settled",
            Some(json!({ "entity": entity, "id": id })),
        ),
        LedgerError::InvalidSchedule { reason } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_schedule",
            Some(json!({ "reason": reason })),
        ),
        LedgerError::Conflict => (StatusCode::CONFLICT, "conflict", None),
        LedgerError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message, details) = match &self {
            ApiError::Ledger(err) => {
                let (status, error_type, details) = ledger_parts(err);
                // Backend faults are logged, never echoed to the client
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "store failure");
                    (
                        status,
                        error_type,
                        "internal server error".to_string(),
                        None,
                    )
                } else {
                    (status, error_type, err.to_string(), details)
                }
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None)
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_ledger_error_status_mapping() {
        let cases = [
            (
                LedgerError::not_found("payable", "x"),
                StatusCode::NOT_FOUND,
            ),
            (LedgerError::Conflict, StatusCode::CONFLICT),
            (
                LedgerError::InUse {
                    utilized: Decimal::ONE,
                },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::AlreadySettled {
                    entity: "payable",
                    id: "x".to_string(),
                },
                StatusCode::CONFLICT,
            ),
            (
                LedgerError::InvalidAmount {
                    amount: Decimal::ZERO,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];

        for (err, expected) in cases {
            let (status, _, _) = ledger_parts(&err);
            assert_eq!(status, expected, "wrong status for {err}");
        }
    }
}
