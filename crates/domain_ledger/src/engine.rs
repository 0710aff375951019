//! Reconciliation engine - the only writer of balance-moving state
//!
//! Every operation takes an explicit [`TenantId`], runs inside a single store
//! transaction, and is all-or-nothing: on any rejection the transaction is
//! rolled back and both sides of the operation are left bit-identical to
//! their stored state.
//!
//! Application preconditions are checked in a fixed order so a request that
//! violates several rules always reports the same error: existence, then
//! amount positivity, then source eligibility, then source balance, then
//! target capacity, then counterparty, then currency.
//!
//! Operations are not idempotent; deduplication is the caller's concern.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use core_kernel::{
    AdvanceId, CounterpartyId, CreditId, Currency, InstallmentId, Money, PayableId, ReceivableId,
    TenantId,
};

use crate::advance::{Advance, AdvanceStatus};
use crate::credit::{Credit, CreditKind, CreditStatus};
use crate::error::LedgerError;
use crate::installment::{Installment, ObligationRef};
use crate::payable::Payable;
use crate::receivable::Receivable;
use crate::store::{LedgerStore, LedgerTx};
use crate::utilization::{FundingSource, Utilization};

/// Request to apply part of a credit to a payable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyCreditRequest {
    pub credit_id: CreditId,
    pub payable_id: PayableId,
    pub amount: Money,
    pub applied_on: NaiveDate,
    pub note: Option<String>,
}

/// Request to apply part of an advance to a payable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyAdvanceRequest {
    pub advance_id: AdvanceId,
    pub payable_id: PayableId,
    pub amount: Money,
    pub applied_on: NaiveDate,
    pub note: Option<String>,
}

/// Result of a successful credit application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditApplication {
    pub utilization: Utilization,
    pub credit: Credit,
    pub payable: Payable,
}

/// Result of a successful advance application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceApplication {
    pub utilization: Utilization,
    pub advance: Advance,
    pub payable: Payable,
}

/// Request to record a direct cash payment against a payable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPaymentRequest {
    pub payable_id: PayableId,
    pub amount: Money,
    pub paid_on: NaiveDate,
    /// Installment to settle first, when the payable is scheduled
    pub installment_id: Option<InstallmentId>,
}

/// Result of a recorded payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecorded {
    pub payable: Payable,
    pub installment: Option<Installment>,
}

/// Request to record an incoming payment against a receivable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterReceiptRequest {
    pub receivable_id: ReceivableId,
    pub amount: Money,
    pub received_on: NaiveDate,
    pub installment_id: Option<InstallmentId>,
}

/// Result of a recorded receipt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptRecorded {
    pub receivable: Receivable,
    pub installment: Option<Installment>,
}

/// One entry of an explicit installment schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub amount: Money,
    pub due_on: NaiveDate,
}

/// Request to create a payable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePayableRequest {
    pub counterparty_id: CounterpartyId,
    pub total: Money,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub document_number: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    /// Advance that funds the full total at creation, if any
    pub funding_advance_id: Option<AdvanceId>,
    /// Explicit installment schedule; amounts must sum to `total`
    pub schedule: Option<Vec<ScheduleEntry>>,
}

/// Request to create a receivable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReceivableRequest {
    pub counterparty_id: CounterpartyId,
    pub total: Money,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub document_number: Option<String>,
    pub description: Option<String>,
}

/// Request to create an advance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAdvanceRequest {
    pub counterparty_id: CounterpartyId,
    pub total: Money,
    pub advanced_on: NaiveDate,
    pub description: Option<String>,
}

/// Request to create a credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCreditRequest {
    pub counterparty_id: CounterpartyId,
    pub kind: CreditKind,
    pub total: Money,
    pub credited_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub origin_payable_id: Option<PayableId>,
    pub reason: Option<String>,
}

/// Parameters for generated equal-split installment schedules
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub count: u32,
    pub interval_days: i64,
    pub first_due: NaiveDate,
}

/// A payable with its schedule and applied funding history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayableDetail {
    pub payable: Payable,
    pub installments: Vec<Installment>,
    pub utilizations: Vec<Utilization>,
}

/// A receivable with its schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivableDetail {
    pub receivable: Receivable,
    pub installments: Vec<Installment>,
}

/// A credit with its consumption history and read-time status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditDetail {
    pub credit: Credit,
    pub utilizations: Vec<Utilization>,
    pub available: Money,
    pub effective_status: CreditStatus,
}

/// An advance with its consumption history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvanceDetail {
    pub advance: Advance,
    pub utilizations: Vec<Utilization>,
    pub available: Money,
}

/// The single entry point for all balance-moving operations
#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn LedgerStore>,
}

impl ReconciliationEngine {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Applies part of a credit's balance to a payable
    pub async fn apply_credit(
        &self,
        tenant: TenantId,
        request: ApplyCreditRequest,
    ) -> Result<CreditApplication, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::apply_credit_tx(tx.as_mut(), tenant, request).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn apply_credit_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        request: ApplyCreditRequest,
    ) -> Result<CreditApplication, LedgerError> {
        let mut credit = tx
            .credit(tenant, request.credit_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("credit", request.credit_id))?;
        let mut payable = tx
            .payable(tenant, request.payable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("payable", request.payable_id))?;

        let effective = credit.effective_status(request.applied_on);
        check_application(
            request.amount,
            SourceView {
                entity: "credit",
                id: credit.id.to_string(),
                eligible: effective == CreditStatus::Available,
                status: effective.as_str(),
                available: credit.available(),
                counterparty_id: credit.counterparty_id,
                currency: credit.currency(),
            },
            &payable,
        )?;

        let utilization = Utilization::new(
            tenant,
            FundingSource::Credit(credit.id),
            payable.id,
            request.amount,
            request.applied_on,
            request.note,
        );
        credit.record_utilization(request.amount);
        payable.apply_funding(request.amount, request.applied_on);

        tx.insert_utilization(&utilization).await?;
        tx.update_credit(&credit).await?;
        tx.update_payable(&payable).await?;

        Ok(CreditApplication {
            utilization,
            credit,
            payable,
        })
    }

    /// Applies part of an advance's balance to a payable
    pub async fn apply_advance(
        &self,
        tenant: TenantId,
        request: ApplyAdvanceRequest,
    ) -> Result<AdvanceApplication, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::apply_advance_tx(tx.as_mut(), tenant, request).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn apply_advance_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        request: ApplyAdvanceRequest,
    ) -> Result<AdvanceApplication, LedgerError> {
        let mut advance = tx
            .advance(tenant, request.advance_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("advance", request.advance_id))?;
        let mut payable = tx
            .payable(tenant, request.payable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("payable", request.payable_id))?;

        check_application(
            request.amount,
            SourceView {
                entity: "advance",
                id: advance.id.to_string(),
                eligible: advance.status == AdvanceStatus::Available,
                status: advance.status.as_str(),
                available: advance.available(),
                counterparty_id: advance.counterparty_id,
                currency: advance.currency(),
            },
            &payable,
        )?;

        let utilization = Utilization::new(
            tenant,
            FundingSource::Advance(advance.id),
            payable.id,
            request.amount,
            request.applied_on,
            request.note,
        );
        advance.record_utilization(request.amount);
        payable.apply_funding(request.amount, request.applied_on);

        tx.insert_utilization(&utilization).await?;
        tx.update_advance(&advance).await?;
        tx.update_payable(&payable).await?;

        Ok(AdvanceApplication {
            utilization,
            advance,
            payable,
        })
    }

    /// Records a direct cash payment against a payable
    ///
    /// When an installment is named it is settled first; the payment amount
    /// must fit within both the installment's remainder and the payable's
    /// pending amount.
    pub async fn register_payment(
        &self,
        tenant: TenantId,
        request: RegisterPaymentRequest,
    ) -> Result<PaymentRecorded, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::register_payment_tx(tx.as_mut(), tenant, request).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn register_payment_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        request: RegisterPaymentRequest,
    ) -> Result<PaymentRecorded, LedgerError> {
        let mut payable = tx
            .payable(tenant, request.payable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("payable", request.payable_id))?;

        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount.amount(),
            });
        }
        if request.amount.currency() != payable.currency() {
            return Err(LedgerError::CurrencyMismatch {
                source_currency: request.amount.currency(),
                target_currency: payable.currency(),
            });
        }
        let pending = payable.pending();
        if !pending.is_positive() {
            return Err(LedgerError::AlreadySettled {
                entity: "payable",
                id: payable.id.to_string(),
            });
        }
        if request.amount.amount() > pending.amount() {
            return Err(LedgerError::ExceedsPending {
                pending: pending.amount(),
                requested: request.amount.amount(),
            });
        }

        let installment = match request.installment_id {
            Some(installment_id) => {
                let mut installment = tx
                    .installment(tenant, installment_id)
                    .await?
                    .filter(|i| i.parent == ObligationRef::Payable(payable.id))
                    .ok_or_else(|| LedgerError::not_found("installment", installment_id))?;

                let remaining = installment.remaining();
                if !remaining.is_positive() {
                    return Err(LedgerError::AlreadySettled {
                        entity: "installment",
                        id: installment.id.to_string(),
                    });
                }
                if request.amount.amount() > remaining.amount() {
                    return Err(LedgerError::ExceedsPending {
                        pending: remaining.amount(),
                        requested: request.amount.amount(),
                    });
                }

                installment.record_settlement(request.amount, request.paid_on);
                tx.update_installment(&installment).await?;
                Some(installment)
            }
            None => None,
        };

        payable.record_payment(request.amount, request.paid_on);
        tx.update_payable(&payable).await?;

        Ok(PaymentRecorded {
            payable,
            installment,
        })
    }

    /// Records an incoming payment against a receivable
    pub async fn register_receipt(
        &self,
        tenant: TenantId,
        request: RegisterReceiptRequest,
    ) -> Result<ReceiptRecorded, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::register_receipt_tx(tx.as_mut(), tenant, request).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn register_receipt_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        request: RegisterReceiptRequest,
    ) -> Result<ReceiptRecorded, LedgerError> {
        let mut receivable = tx
            .receivable(tenant, request.receivable_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("receivable", request.receivable_id))?;

        if !request.amount.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.amount.amount(),
            });
        }
        if request.amount.currency() != receivable.currency() {
            return Err(LedgerError::CurrencyMismatch {
                source_currency: request.amount.currency(),
                target_currency: receivable.currency(),
            });
        }
        let outstanding = receivable.outstanding();
        if !outstanding.is_positive() {
            return Err(LedgerError::AlreadySettled {
                entity: "receivable",
                id: receivable.id.to_string(),
            });
        }
        if request.amount.amount() > outstanding.amount() {
            return Err(LedgerError::ExceedsPending {
                pending: outstanding.amount(),
                requested: request.amount.amount(),
            });
        }

        let installment = match request.installment_id {
            Some(installment_id) => {
                let mut installment = tx
                    .installment(tenant, installment_id)
                    .await?
                    .filter(|i| i.parent == ObligationRef::Receivable(receivable.id))
                    .ok_or_else(|| LedgerError::not_found("installment", installment_id))?;

                let remaining = installment.remaining();
                if !remaining.is_positive() {
                    return Err(LedgerError::AlreadySettled {
                        entity: "installment",
                        id: installment.id.to_string(),
                    });
                }
                if request.amount.amount() > remaining.amount() {
                    return Err(LedgerError::ExceedsPending {
                        pending: remaining.amount(),
                        requested: request.amount.amount(),
                    });
                }

                installment.record_settlement(request.amount, request.received_on);
                tx.update_installment(&installment).await?;
                Some(installment)
            }
            None => None,
        };

        receivable.record_receipt(request.amount, request.received_on);
        tx.update_receivable(&receivable).await?;

        Ok(ReceiptRecorded {
            receivable,
            installment,
        })
    }

    /// Creates a payable, optionally funded by an advance and scheduled
    ///
    /// Advance funding covers the full total at creation and goes through the
    /// utilization path, so the advance's consumed balance and the payable's
    /// applied bucket stay conserved.
    pub async fn create_payable(
        &self,
        tenant: TenantId,
        request: CreatePayableRequest,
    ) -> Result<PayableDetail, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::create_payable_tx(tx.as_mut(), tenant, request).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn create_payable_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        request: CreatePayableRequest,
    ) -> Result<PayableDetail, LedgerError> {
        if !request.total.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.total.amount(),
            });
        }

        let mut payable = Payable::new(
            tenant,
            request.counterparty_id,
            request.total,
            request.issued_on,
            request.due_on,
        );
        if let Some(number) = request.document_number {
            payable = payable.with_document_number(number);
        }
        if let Some(description) = request.description {
            payable = payable.with_description(description);
        }
        if let Some(note) = request.note {
            payable = payable.with_note(note);
        }

        // Validate and stage everything in memory before the first write, so
        // the writes can land in foreign-key order (payable first).
        let funding = match request.funding_advance_id {
            Some(advance_id) => {
                let mut advance = tx
                    .advance(tenant, advance_id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("advance", advance_id))?;

                check_application(
                    request.total,
                    SourceView {
                        entity: "advance",
                        id: advance.id.to_string(),
                        eligible: advance.status == AdvanceStatus::Available,
                        status: advance.status.as_str(),
                        available: advance.available(),
                        counterparty_id: advance.counterparty_id,
                        currency: advance.currency(),
                    },
                    &payable,
                )?;

                let utilization = Utilization::new(
                    tenant,
                    FundingSource::Advance(advance.id),
                    payable.id,
                    request.total,
                    request.issued_on,
                    None,
                );
                advance.record_utilization(request.total);
                payable.apply_funding(request.total, request.issued_on);
                payable.advance_id = Some(advance.id);
                Some((advance, utilization))
            }
            None => None,
        };

        // A schedule describes how the pending amount falls due; funding
        // consumed at creation already settles part (or all) of it, so the
        // two cannot be combined on one payable.
        let installments = match request.schedule {
            Some(_) if funding.is_some() => {
                return Err(LedgerError::InvalidSchedule {
                    reason: "cannot schedule a payable funded by an advance".to_string(),
                });
            }
            Some(entries) => build_explicit_schedule(
                tenant,
                ObligationRef::Payable(payable.id),
                payable.total,
                entries,
            )?,
            None => Vec::new(),
        };

        tx.insert_payable(&payable).await?;
        for installment in &installments {
            tx.insert_installment(installment).await?;
        }
        let mut utilizations = Vec::new();
        if let Some((advance, utilization)) = funding {
            tx.update_advance(&advance).await?;
            tx.insert_utilization(&utilization).await?;
            utilizations.push(utilization);
        }

        Ok(PayableDetail {
            payable,
            installments,
            utilizations,
        })
    }

    /// Creates a receivable
    pub async fn create_receivable(
        &self,
        tenant: TenantId,
        request: CreateReceivableRequest,
    ) -> Result<Receivable, LedgerError> {
        if !request.total.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.total.amount(),
            });
        }

        let mut receivable = Receivable::new(
            tenant,
            request.counterparty_id,
            request.total,
            request.issued_on,
            request.due_on,
        );
        if let Some(number) = request.document_number {
            receivable = receivable.with_document_number(number);
        }
        if let Some(description) = request.description {
            receivable = receivable.with_description(description);
        }

        let mut tx = self.store.begin().await?;
        match tx.insert_receivable(&receivable).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(receivable)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err.into())
            }
        }
    }

    /// Creates an advance
    pub async fn create_advance(
        &self,
        tenant: TenantId,
        request: CreateAdvanceRequest,
    ) -> Result<Advance, LedgerError> {
        if !request.total.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.total.amount(),
            });
        }

        let mut advance = Advance::new(
            tenant,
            request.counterparty_id,
            request.total,
            request.advanced_on,
        );
        if let Some(description) = request.description {
            advance = advance.with_description(description);
        }

        let mut tx = self.store.begin().await?;
        match tx.insert_advance(&advance).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(advance)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err.into())
            }
        }
    }

    /// Creates a credit
    pub async fn create_credit(
        &self,
        tenant: TenantId,
        request: CreateCreditRequest,
    ) -> Result<Credit, LedgerError> {
        if !request.total.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: request.total.amount(),
            });
        }

        let mut credit = Credit::new(
            tenant,
            request.counterparty_id,
            request.kind,
            request.total,
            request.credited_on,
        );
        if let Some(expires_on) = request.expires_on {
            credit = credit.with_expiry(expires_on);
        }
        if let Some(payable_id) = request.origin_payable_id {
            credit = credit.with_origin(payable_id);
        }
        if let Some(reason) = request.reason {
            credit = credit.with_reason(reason);
        }

        let mut tx = self.store.begin().await?;
        match tx.insert_credit(&credit).await {
            Ok(()) => {
                tx.commit().await?;
                Ok(credit)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err.into())
            }
        }
    }

    /// Generates an equal-split installment schedule for an obligation
    ///
    /// The parent must be untouched: no existing installments and nothing
    /// settled against it yet. The generated amounts sum exactly to the
    /// parent's total; the split remainder lands on the earliest installments.
    pub async fn generate_installments(
        &self,
        tenant: TenantId,
        parent: ObligationRef,
        plan: InstallmentPlan,
    ) -> Result<Vec<Installment>, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::generate_installments_tx(tx.as_mut(), tenant, parent, plan).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn generate_installments_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        parent: ObligationRef,
        plan: InstallmentPlan,
    ) -> Result<Vec<Installment>, LedgerError> {
        // The plan arrives straight from the request body; bound it before
        // any arithmetic so out-of-range values stay a typed rejection.
        const MAX_COUNT: u32 = 120;
        const MAX_INTERVAL_DAYS: i64 = 3660;

        if plan.count < 2 {
            return Err(LedgerError::InvalidSchedule {
                reason: format!("schedule needs at least 2 installments, got {}", plan.count),
            });
        }
        if plan.count > MAX_COUNT {
            return Err(LedgerError::InvalidSchedule {
                reason: format!(
                    "schedule cannot exceed {MAX_COUNT} installments, got {}",
                    plan.count
                ),
            });
        }
        if plan.interval_days < 1 || plan.interval_days > MAX_INTERVAL_DAYS {
            return Err(LedgerError::InvalidSchedule {
                reason: format!(
                    "interval must be between 1 and {MAX_INTERVAL_DAYS} days, got {}",
                    plan.interval_days
                ),
            });
        }

        let total = match parent {
            ObligationRef::Payable(id) => {
                let payable = tx
                    .payable(tenant, id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("payable", id))?;
                if payable.paid.is_positive() || payable.credit_applied.is_positive() {
                    return Err(LedgerError::InvalidSchedule {
                        reason: "payable already has settled amounts".to_string(),
                    });
                }
                payable.total
            }
            ObligationRef::Receivable(id) => {
                let receivable = tx
                    .receivable(tenant, id)
                    .await?
                    .ok_or_else(|| LedgerError::not_found("receivable", id))?;
                if receivable.received.is_positive() {
                    return Err(LedgerError::InvalidSchedule {
                        reason: "receivable already has settled amounts".to_string(),
                    });
                }
                receivable.total
            }
        };

        if !tx.installments_for(tenant, parent).await?.is_empty() {
            return Err(LedgerError::InvalidSchedule {
                reason: "obligation already has an installment schedule".to_string(),
            });
        }

        let amounts = total
            .allocate(plan.count)
            .map_err(|err| LedgerError::InvalidSchedule {
                reason: err.to_string(),
            })?;
        let mut installments = Vec::with_capacity(amounts.len());
        for (index, amount) in amounts.into_iter().enumerate() {
            let due_on = plan.first_due + Duration::days(plan.interval_days * index as i64);
            let installment = Installment::new(tenant, parent, index as u32 + 1, amount, due_on);
            tx.insert_installment(&installment).await?;
            installments.push(installment);
        }

        Ok(installments)
    }

    /// Raises or lowers a credit's total
    ///
    /// Lowering below the consumed balance is rejected with `InUse`.
    pub async fn update_credit_total(
        &self,
        tenant: TenantId,
        credit_id: CreditId,
        total: Money,
    ) -> Result<Credit, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::update_credit_total_tx(tx.as_mut(), tenant, credit_id, total).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn update_credit_total_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        credit_id: CreditId,
        total: Money,
    ) -> Result<Credit, LedgerError> {
        let mut credit = tx
            .credit(tenant, credit_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("credit", credit_id))?;

        if !total.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: total.amount(),
            });
        }
        if total.currency() != credit.currency() {
            return Err(LedgerError::CurrencyMismatch {
                source_currency: total.currency(),
                target_currency: credit.currency(),
            });
        }
        if total.amount() < credit.utilized.amount() {
            return Err(LedgerError::InUse {
                utilized: credit.utilized.amount(),
            });
        }

        credit.set_total(total);
        tx.update_credit(&credit).await?;
        Ok(credit)
    }

    /// Raises or lowers an advance's total, same rule as credits
    pub async fn update_advance_total(
        &self,
        tenant: TenantId,
        advance_id: AdvanceId,
        total: Money,
    ) -> Result<Advance, LedgerError> {
        let mut tx = self.store.begin().await?;
        match Self::update_advance_total_tx(tx.as_mut(), tenant, advance_id, total).await {
            Ok(outcome) => {
                tx.commit().await?;
                Ok(outcome)
            }
            Err(err) => {
                tx.rollback().await.ok();
                Err(err)
            }
        }
    }

    async fn update_advance_total_tx(
        tx: &mut dyn LedgerTx,
        tenant: TenantId,
        advance_id: AdvanceId,
        total: Money,
    ) -> Result<Advance, LedgerError> {
        let mut advance = tx
            .advance(tenant, advance_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("advance", advance_id))?;

        if !total.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: total.amount(),
            });
        }
        if total.currency() != advance.currency() {
            return Err(LedgerError::CurrencyMismatch {
                source_currency: total.currency(),
                target_currency: advance.currency(),
            });
        }
        if total.amount() < advance.utilized.amount() {
            return Err(LedgerError::InUse {
                utilized: advance.utilized.amount(),
            });
        }

        advance.set_total(total);
        tx.update_advance(&advance).await?;
        Ok(advance)
    }

    /// Reads a payable with its installments and funding history
    pub async fn payable_detail(
        &self,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<PayableDetail, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let payable = tx
                .payable(tenant, payable_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("payable", payable_id))?;
            let installments = tx
                .installments_for(tenant, ObligationRef::Payable(payable_id))
                .await?;
            let utilizations = tx.utilizations_for_payable(tenant, payable_id).await?;
            Ok(PayableDetail {
                payable,
                installments,
                utilizations,
            })
        }
        .await;
        tx.rollback().await.ok();
        result
    }

    /// Reads a receivable with its installments
    pub async fn receivable_detail(
        &self,
        tenant: TenantId,
        receivable_id: ReceivableId,
    ) -> Result<ReceivableDetail, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let receivable = tx
                .receivable(tenant, receivable_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("receivable", receivable_id))?;
            let installments = tx
                .installments_for(tenant, ObligationRef::Receivable(receivable_id))
                .await?;
            Ok(ReceivableDetail {
                receivable,
                installments,
            })
        }
        .await;
        tx.rollback().await.ok();
        result
    }

    /// Reads a credit with its consumption history, statused as of a date
    pub async fn credit_detail(
        &self,
        tenant: TenantId,
        credit_id: CreditId,
        as_of: NaiveDate,
    ) -> Result<CreditDetail, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let credit = tx
                .credit(tenant, credit_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("credit", credit_id))?;
            let utilizations = tx
                .utilizations_for_source(tenant, FundingSource::Credit(credit_id))
                .await?;
            let available = credit.available();
            let effective_status = credit.effective_status(as_of);
            Ok(CreditDetail {
                credit,
                utilizations,
                available,
                effective_status,
            })
        }
        .await;
        tx.rollback().await.ok();
        result
    }

    /// Reads an advance with its consumption history
    pub async fn advance_detail(
        &self,
        tenant: TenantId,
        advance_id: AdvanceId,
    ) -> Result<AdvanceDetail, LedgerError> {
        let mut tx = self.store.begin().await?;
        let result = async {
            let advance = tx
                .advance(tenant, advance_id)
                .await?
                .ok_or_else(|| LedgerError::not_found("advance", advance_id))?;
            let utilizations = tx
                .utilizations_for_source(tenant, FundingSource::Advance(advance_id))
                .await?;
            let available = advance.available();
            Ok(AdvanceDetail {
                advance,
                utilizations,
                available,
            })
        }
        .await;
        tx.rollback().await.ok();
        result
    }

    pub(crate) fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }
}

/// The funding-source half of an application, flattened for validation
struct SourceView {
    entity: &'static str,
    id: String,
    eligible: bool,
    status: &'static str,
    available: Money,
    counterparty_id: CounterpartyId,
    currency: Currency,
}

/// Application preconditions, checked in their fixed order
///
/// Balance comparisons run on raw decimal values so a currency-mismatched
/// request is still rejected by whichever earlier rule it also violates.
fn check_application(
    amount: Money,
    source: SourceView,
    payable: &Payable,
) -> Result<(), LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount {
            amount: amount.amount(),
        });
    }
    if !source.eligible {
        return Err(LedgerError::CreditUnavailable {
            entity: source.entity,
            id: source.id,
            status: source.status.to_string(),
        });
    }
    if amount.amount() > source.available.amount() {
        return Err(LedgerError::InsufficientBalance {
            available: source.available.amount(),
            requested: amount.amount(),
        });
    }
    let pending = payable.pending();
    if !pending.is_positive() {
        return Err(LedgerError::AlreadySettled {
            entity: "payable",
            id: payable.id.to_string(),
        });
    }
    if amount.amount() > pending.amount() {
        return Err(LedgerError::ExceedsPending {
            pending: pending.amount(),
            requested: amount.amount(),
        });
    }
    if source.counterparty_id != payable.counterparty_id {
        return Err(LedgerError::CounterpartyMismatch {
            source_counterparty: source.counterparty_id,
            target_counterparty: payable.counterparty_id,
        });
    }
    if source.currency != payable.currency() || amount.currency() != payable.currency() {
        return Err(LedgerError::CurrencyMismatch {
            source_currency: if source.currency != payable.currency() {
                source.currency
            } else {
                amount.currency()
            },
            target_currency: payable.currency(),
        });
    }
    Ok(())
}

/// Validates an explicit schedule against its parent and builds the rows
fn build_explicit_schedule(
    tenant: TenantId,
    parent: ObligationRef,
    total: Money,
    entries: Vec<ScheduleEntry>,
) -> Result<Vec<Installment>, LedgerError> {
    if entries.len() < 2 {
        return Err(LedgerError::InvalidSchedule {
            reason: format!(
                "schedule needs at least 2 installments, got {}",
                entries.len()
            ),
        });
    }

    let mut sum = Money::zero(total.currency());
    for entry in &entries {
        if !entry.amount.is_positive() {
            return Err(LedgerError::InvalidSchedule {
                reason: format!("installment amount must be positive, got {}", entry.amount),
            });
        }
        if entry.amount.currency() != total.currency() {
            return Err(LedgerError::InvalidSchedule {
                reason: format!(
                    "installment currency {} differs from obligation currency {}",
                    entry.amount.currency(),
                    total.currency()
                ),
            });
        }
        sum = sum + entry.amount;
    }
    if sum.amount() != total.amount() {
        return Err(LedgerError::InvalidSchedule {
            reason: format!(
                "installment amounts sum to {}, obligation total is {}",
                sum.amount(),
                total.amount()
            ),
        });
    }

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            Installment::new(tenant, parent, index as u32 + 1, entry.amount, entry.due_on)
        })
        .collect())
}
