//! Receivables/payables reconciliation ledger
//!
//! Multi-tenant back-office bookkeeping for a travel operator: obligations
//! owed to suppliers (payables) and by customers (receivables), optional
//! installment schedules, and two kinds of reusable funding balances
//! (advances and credits) that can be applied against payables through an
//! append-only utilization trail.
//!
//! All balance-moving writes go through the [`engine::ReconciliationEngine`];
//! destructive operations go through the lifecycle guard in [`guard`]. The
//! persistence seam is the [`store::LedgerStore`] trait, with an in-memory
//! reference implementation in [`memory`].

pub mod advance;
pub mod balance;
pub mod credit;
pub mod engine;
pub mod error;
pub mod guard;
pub mod installment;
pub mod memory;
pub mod payable;
pub mod receivable;
pub mod store;
pub mod utilization;

pub use advance::{Advance, AdvanceStatus};
pub use credit::{Credit, CreditKind, CreditStatus};
pub use engine::ReconciliationEngine;
pub use error::LedgerError;
pub use installment::{Installment, InstallmentStatus, ObligationRef};
pub use memory::MemoryLedgerStore;
pub use payable::{Payable, PayableStatus};
pub use receivable::{Receivable, ReceivableStatus};
pub use store::{LedgerStore, LedgerTx, StoreError};
pub use utilization::{FundingSource, Utilization};
