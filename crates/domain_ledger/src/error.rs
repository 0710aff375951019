//! Ledger domain errors
//!
//! Every business-rule rejection carries the structured detail a caller needs
//! to render a precise message: which constraint fired and the two amounts or
//! records involved. All variants except `Conflict` are terminal for the
//! current call; `Conflict` alone may be retried from a fresh read.

use core_kernel::{CounterpartyId, Currency};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by the reconciliation engine and lifecycle guard
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Entity missing, or present but owned by another tenant
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Non-positive amount supplied to an operation
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: Decimal },

    /// Funding source is not in an applicable state (fully utilized or expired)
    #[error("{entity} {id} is not available (status: {status})")]
    CreditUnavailable {
        entity: &'static str,
        id: String,
        status: String,
    },

    /// Funding source holds less than the requested amount
    #[error("Requested {requested} exceeds available balance {available}")]
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    /// Target obligation cannot absorb the requested amount
    #[error("Requested {requested} exceeds pending amount {pending}")]
    ExceedsPending { pending: Decimal, requested: Decimal },

    /// Funding source and obligation belong to different counterparties
    #[error("Counterparty mismatch: source belongs to {source_counterparty}, target to {target_counterparty}")]
    CounterpartyMismatch {
        source_counterparty: CounterpartyId,
        target_counterparty: CounterpartyId,
    },

    /// Funding source and obligation are denominated in different currencies
    #[error("Currency mismatch: source is {source_currency}, target is {target_currency}")]
    CurrencyMismatch {
        source_currency: Currency,
        target_currency: Currency,
    },

    /// Destructive operation blocked by nonzero consumed balance
    #[error("Record is in use: consumed balance is {utilized}")]
    InUse { utilized: Decimal },

    /// Mutation attempted on a fully settled record
    #[error("{entity} {id} is already settled")]
    AlreadySettled { entity: &'static str, id: String },

    /// Installment schedule violates its parent obligation
    #[error("Invalid installment schedule: {reason}")]
    InvalidSchedule { reason: String },

    /// Transaction serialization failure; safe to retry from a fresh read
    #[error("Transaction conflict, retry from a fresh read")]
    Conflict,

    /// Store backend failure (connection, query, constraint)
    #[error("Store failure: {0}")]
    Store(StoreError),
}

impl LedgerError {
    /// Creates a NotFound error for an entity kind and identifier
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        LedgerError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if the caller may retry the whole operation
    pub fn is_retriable(&self) -> bool {
        matches!(self, LedgerError::Conflict)
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => LedgerError::Conflict,
            other => LedgerError::Store(other),
        }
    }
}
