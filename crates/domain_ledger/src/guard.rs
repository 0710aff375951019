//! Lifecycle guard - destructive operations and their preconditions
//!
//! Deletes are guarded: a record with a nonzero consumed balance cannot be
//! removed without first reversing the consumption. The reversal paths are
//! exact inverses of the apply paths, so a reverse-and-delete cascade leaves
//! every funding source bit-identical to its pre-application state.

use core_kernel::{AdvanceId, CreditId, PayableId, ReceivableId, TenantId, UtilizationId};

use crate::advance::Advance;
use crate::credit::Credit;
use crate::engine::ReconciliationEngine;
use crate::error::LedgerError;
use crate::installment::ObligationRef;
use crate::payable::Payable;
use crate::receivable::Receivable;
use crate::store::LedgerTx;
use crate::utilization::FundingSource;

/// A credit can be deleted only while untouched
pub fn can_delete_credit(credit: &Credit) -> Result<(), LedgerError> {
    if credit.utilized.is_positive() {
        return Err(LedgerError::InUse {
            utilized: credit.utilized.amount(),
        });
    }
    Ok(())
}

/// An advance can be deleted only while untouched
pub fn can_delete_advance(advance: &Advance) -> Result<(), LedgerError> {
    if advance.utilized.is_positive() {
        return Err(LedgerError::InUse {
            utilized: advance.utilized.amount(),
        });
    }
    Ok(())
}

/// A payable can be deleted only while nothing is settled against it
pub fn can_delete_payable(payable: &Payable) -> Result<(), LedgerError> {
    let consumed = payable.paid.amount() + payable.credit_applied.amount();
    if consumed > rust_decimal::Decimal::ZERO {
        return Err(LedgerError::InUse { utilized: consumed });
    }
    Ok(())
}

/// A receivable can be deleted only while nothing has been received
pub fn can_delete_receivable(receivable: &Receivable) -> Result<(), LedgerError> {
    if receivable.received.is_positive() {
        return Err(LedgerError::InUse {
            utilized: receivable.received.amount(),
        });
    }
    Ok(())
}

impl ReconciliationEngine {
    /// Deletes an untouched payable and its schedule
    pub async fn delete_payable(
        &self,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<(), LedgerError> {
        let mut tx = self.store().begin().await?;
        match Self::delete_payable_tx(tx.as_mut(), tenant, payable_id).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn delete_payable_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<(), LedgerError> {
        let payable = tx
            .payable(tenant, payable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("payable", payable_id))?;
        can_delete_payable(&payable)?;

        tx.delete_installments_for(tenant, ObligationRef::Payable(payable_id))
            .await?;
        tx.delete_payable(tenant, payable_id).await?;
        Ok(())
    }

    /// Deletes an untouched receivable and its schedule
    pub async fn delete_receivable(
        &self,
        tenant: TenantId,
        receivable_id: ReceivableId,
    ) -> Result<(), LedgerError> {
        let mut tx = self.store().begin().await?;
        match Self::delete_receivable_tx(tx.as_mut(), tenant, receivable_id).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn delete_receivable_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        receivable_id: ReceivableId,
    ) -> Result<(), LedgerError> {
        let receivable = tx
            .receivable(tenant, receivable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("receivable", receivable_id))?;
        can_delete_receivable(&receivable)?;

        tx.delete_installments_for(tenant, ObligationRef::Receivable(receivable_id))
            .await?;
        tx.delete_receivable(tenant, receivable_id).await?;
        Ok(())
    }

    /// Deletes an untouched advance
    pub async fn delete_advance(
        &self,
        tenant: TenantId,
        advance_id: AdvanceId,
    ) -> Result<(), LedgerError> {
        let mut tx = self.store().begin().await?;
        let result = async {
            let advance = tx
                .advance(tenant, advance_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("advance", advance_id))?;
            can_delete_advance(&advance)?;
            tx.delete_advance(tenant, advance_id).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    /// Deletes an untouched credit
    pub async fn delete_credit(
        &self,
        tenant: TenantId,
        credit_id: CreditId,
    ) -> Result<(), LedgerError> {
        let mut tx = self.store().begin().await?;
        let result = async {
            let credit = tx
                .credit(tenant, credit_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("credit", credit_id))?;
            can_delete_credit(&credit)?;
            tx.delete_credit(tenant, credit_id).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    /// Reverses every application against a payable, then deletes it
    ///
    /// For each utilization row the source advance/credit gets its consumed
    /// balance decremented by exactly the row's amount, restoring `Available`
    /// status where a remainder appears. Direct cash payments are not
    /// reversible; a payable with `paid > 0` is still rejected with `InUse`.
    pub async fn reverse_and_delete_payable(
        &self,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<(), LedgerError> {
        let mut tx = self.store().begin().await?;
        match Self::reverse_and_delete_payable_tx(tx.as_mut(), tenant, payable_id).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn reverse_and_delete_payable_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<(), LedgerError> {
        let payable = tx
            .payable(tenant, payable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("payable", payable_id))?;
        if payable.paid.is_positive() {
            return Err(LedgerError::InUse {
                utilized: payable.paid.amount(),
            });
        }

        for utilization in tx.utilizations_for_payable(tenant, payable_id).await? {
            match utilization.source {
                FundingSource::Advance(advance_id) => {
                    let mut advance = tx
                        .advance(tenant, advance_id)
                        .await?
                        .ok_or_else(|| LedgerError::not_found("advance", advance_id))?;
                    advance.reverse_utilization(utilization.amount);
                    tx.update_advance(&advance).await?;
                }
                FundingSource::Credit(credit_id) => {
                    let mut credit = tx
                        .credit(tenant, credit_id)
                        .await?
                        .ok_or_else(|| LedgerError::not_found("credit", credit_id))?;
                    credit.reverse_utilization(utilization.amount);
                    tx.update_credit(&credit).await?;
                }
            }
            tx.delete_utilization(tenant, utilization.id).await?;
        }

        tx.delete_installments_for(tenant, ObligationRef::Payable(payable_id))
            .await?;
        tx.delete_payable(tenant, payable_id).await?;
        Ok(())
    }

    /// Reverses a single application, returning its amount to the source
    ///
    /// The inverse of `apply_credit`/`apply_advance`: the source regains the
    /// amount, the payable's applied bucket shrinks, both statuses are
    /// recomputed, and the utilization row is removed. The payable reopens
    /// and loses its settled-on date when its pending amount becomes positive
    /// again.
    pub async fn reverse_utilization(
        &self,
        tenant: TenantId,
        utilization_id: UtilizationId,
    ) -> Result<Payable, LedgerError> {
        let mut tx = self.store().begin().await?;
        match Self::reverse_utilization_tx(tx.as_mut(), tenant, utilization_id).await {
            Ok(payable) => {
                tx.commit().await?;
                Ok(payable)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn reverse_utilization_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        utilization_id: UtilizationId,
    ) -> Result<Payable, LedgerError> {
        let utilization = tx
            .utilization(tenant, utilization_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("utilization", utilization_id))?;

        match utilization.source {
            FundingSource::Advance(advance_id) => {
                let mut advance = tx
                    .advance(tenant, advance_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("advance", advance_id))?;
                advance.reverse_utilization(utilization.amount);
                tx.update_advance(&advance).await?;
            }
            FundingSource::Credit(credit_id) => {
                let mut credit = tx
                    .credit(tenant, credit_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("credit", credit_id))?;
                credit.reverse_utilization(utilization.amount);
                tx.update_credit(&credit).await?;
            }
        }

        let mut payable = tx
            .payable(tenant, utilization.payable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("payable", utilization.payable_id))?;
        payable.reverse_funding(utilization.amount);
        tx.update_payable(&payable).await?;

        tx.delete_utilization(tenant, utilization.id).await?;
        Ok(payable)
    }
}
