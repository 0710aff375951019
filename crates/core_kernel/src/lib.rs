//! Core Kernel - Foundational types for the reconciliation ledger
//!
//! This crate provides the building blocks shared by every layer of the
//! system:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for ledger entities

pub mod identifiers;
pub mod money;

pub use identifiers::{
    AdvanceId, CounterpartyId, CreditId, InstallmentId, PayableId, ReceivableId, TenantId,
    UtilizationId,
};
pub use money::{Currency, Money, MoneyError};
