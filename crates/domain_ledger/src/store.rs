//! Ledger store contract
//!
//! The engine consumes a transactional store through this narrow seam. Every
//! multi-row effect runs inside one transaction obtained from
//! [`LedgerStore::begin`]; the store must either serialize concurrent
//! transactions touching the same rows or abort one with
//! [`StoreError::Conflict`], which the caller may retry from a fresh read.
//!
//! All reads are keyed by `(tenant_id, id)` — a row owned by another tenant
//! is indistinguishable from a missing row.

use async_trait::async_trait;
use thiserror::Error;

use core_kernel::{
    AdvanceId, CreditId, InstallmentId, PayableId, ReceivableId, TenantId, UtilizationId,
};

use crate::advance::Advance;
use crate::credit::Credit;
use crate::installment::{Installment, ObligationRef};
use crate::payable::Payable;
use crate::receivable::Receivable;
use crate::utilization::{FundingSource, Utilization};

/// Errors surfaced by a ledger store implementation
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transaction serialization failure; the only retriable class
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// Any other backend failure (connection, query, constraint)
    #[error("backend failure: {0}")]
    Backend(String),
}

/// A transactional ledger store
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a new transaction
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;
}

/// One all-or-nothing unit of work against the six ledger tables
///
/// Dropping a transaction without calling [`LedgerTx::commit`] must discard
/// its writes.
#[async_trait]
pub trait LedgerTx: Send {
    // Payables
    async fn payable(&mut self, tenant: TenantId, id: PayableId)
        -> Result<Option<Payable>, StoreError>;
    async fn insert_payable(&mut self, payable: &Payable) -> Result<(), StoreError>;
    async fn update_payable(&mut self, payable: &Payable) -> Result<(), StoreError>;
    async fn delete_payable(&mut self, tenant: TenantId, id: PayableId) -> Result<(), StoreError>;

    // Receivables
    async fn receivable(
        &mut self,
        tenant: TenantId,
        id: ReceivableId,
    ) -> Result<Option<Receivable>, StoreError>;
    async fn insert_receivable(&mut self, receivable: &Receivable) -> Result<(), StoreError>;
    async fn update_receivable(&mut self, receivable: &Receivable) -> Result<(), StoreError>;
    async fn delete_receivable(
        &mut self,
        tenant: TenantId,
        id: ReceivableId,
    ) -> Result<(), StoreError>;

    // Installments
    async fn installment(
        &mut self,
        tenant: TenantId,
        id: InstallmentId,
    ) -> Result<Option<Installment>, StoreError>;
    async fn insert_installment(&mut self, installment: &Installment) -> Result<(), StoreError>;
    async fn update_installment(&mut self, installment: &Installment) -> Result<(), StoreError>;
    async fn installments_for(
        &mut self,
        tenant: TenantId,
        parent: ObligationRef,
    ) -> Result<Vec<Installment>, StoreError>;
    async fn delete_installments_for(
        &mut self,
        tenant: TenantId,
        parent: ObligationRef,
    ) -> Result<(), StoreError>;

    // Advances
    async fn advance(&mut self, tenant: TenantId, id: AdvanceId)
        -> Result<Option<Advance>, StoreError>;
    async fn insert_advance(&mut self, advance: &Advance) -> Result<(), StoreError>;
    async fn update_advance(&mut self, advance: &Advance) -> Result<(), StoreError>;
    async fn delete_advance(&mut self, tenant: TenantId, id: AdvanceId) -> Result<(), StoreError>;

    // Credits
    async fn credit(&mut self, tenant: TenantId, id: CreditId)
        -> Result<Option<Credit>, StoreError>;
    async fn insert_credit(&mut self, credit: &Credit) -> Result<(), StoreError>;
    async fn update_credit(&mut self, credit: &Credit) -> Result<(), StoreError>;
    async fn delete_credit(&mut self, tenant: TenantId, id: CreditId) -> Result<(), StoreError>;

    // Utilizations (append-only: insert and delete, never update)
    async fn utilization(
        &mut self,
        tenant: TenantId,
        id: UtilizationId,
    ) -> Result<Option<Utilization>, StoreError>;
    async fn insert_utilization(&mut self, utilization: &Utilization) -> Result<(), StoreError>;
    async fn delete_utilization(
        &mut self,
        tenant: TenantId,
        id: UtilizationId,
    ) -> Result<(), StoreError>;
    async fn utilizations_for_payable(
        &mut self,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<Vec<Utilization>, StoreError>;
    async fn utilizations_for_source(
        &mut self,
        tenant: TenantId,
        source: FundingSource,
    ) -> Result<Vec<Utilization>, StoreError>;

    /// Makes the transaction's writes durable
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards the transaction's writes
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
