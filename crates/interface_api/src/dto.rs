//! Request bodies
//!
//! Monetary values cross the wire as decimal strings plus an ISO currency
//! code, never floating point. Each body converts into the corresponding
//! engine request.

use chrono::NaiveDate;
use core_kernel::{AdvanceId, CounterpartyId, CreditId, Currency, InstallmentId, Money, PayableId};
use domain_ledger::engine::{
    ApplyAdvanceRequest, ApplyCreditRequest, CreateAdvanceRequest, CreateCreditRequest,
    CreatePayableRequest, CreateReceivableRequest, InstallmentPlan, RegisterPaymentRequest,
    RegisterReceiptRequest, ScheduleEntry,
};
use domain_ledger::CreditKind;
use rust_decimal::Decimal;
use serde::Deserialize;

/// A monetary value on the wire: decimal string + currency code
#[derive(Debug, Clone, Deserialize)]
pub struct MoneyBody {
    pub amount: Decimal,
    pub currency: Currency,
}

impl From<MoneyBody> for Money {
    fn from(body: MoneyBody) -> Self {
        Money::new(body.amount, body.currency)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleEntryBody {
    pub amount: MoneyBody,
    pub due_on: NaiveDate,
}

impl From<ScheduleEntryBody> for ScheduleEntry {
    fn from(body: ScheduleEntryBody) -> Self {
        ScheduleEntry {
            amount: body.amount.into(),
            due_on: body.due_on,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePayableBody {
    pub counterparty_id: CounterpartyId,
    pub total: MoneyBody,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub document_number: Option<String>,
    pub description: Option<String>,
    pub note: Option<String>,
    pub funding_advance_id: Option<AdvanceId>,
    pub schedule: Option<Vec<ScheduleEntryBody>>,
}

impl From<CreatePayableBody> for CreatePayableRequest {
    fn from(body: CreatePayableBody) -> Self {
        CreatePayableRequest {
            counterparty_id: body.counterparty_id,
            total: body.total.into(),
            issued_on: body.issued_on,
            due_on: body.due_on,
            document_number: body.document_number,
            description: body.description,
            note: body.note,
            funding_advance_id: body.funding_advance_id,
            schedule: body
                .schedule
                .map(|entries| entries.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateReceivableBody {
    pub counterparty_id: CounterpartyId,
    pub total: MoneyBody,
    pub issued_on: NaiveDate,
    pub due_on: NaiveDate,
    pub document_number: Option<String>,
    pub description: Option<String>,
}

impl From<CreateReceivableBody> for CreateReceivableRequest {
    fn from(body: CreateReceivableBody) -> Self {
        CreateReceivableRequest {
            counterparty_id: body.counterparty_id,
            total: body.total.into(),
            issued_on: body.issued_on,
            due_on: body.due_on,
            document_number: body.document_number,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAdvanceBody {
    pub counterparty_id: CounterpartyId,
    pub total: MoneyBody,
    pub advanced_on: NaiveDate,
    pub description: Option<String>,
}

impl From<CreateAdvanceBody> for CreateAdvanceRequest {
    fn from(body: CreateAdvanceBody) -> Self {
        CreateAdvanceRequest {
            counterparty_id: body.counterparty_id,
            total: body.total.into(),
            advanced_on: body.advanced_on,
            description: body.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCreditBody {
    pub counterparty_id: CounterpartyId,
    pub kind: CreditKind,
    pub total: MoneyBody,
    pub credited_on: NaiveDate,
    pub expires_on: Option<NaiveDate>,
    pub origin_payable_id: Option<PayableId>,
    pub reason: Option<String>,
}

impl From<CreateCreditBody> for CreateCreditRequest {
    fn from(body: CreateCreditBody) -> Self {
        CreateCreditRequest {
            counterparty_id: body.counterparty_id,
            kind: body.kind,
            total: body.total.into(),
            credited_on: body.credited_on,
            expires_on: body.expires_on,
            origin_payable_id: body.origin_payable_id,
            reason: body.reason,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub amount: MoneyBody,
    pub paid_on: NaiveDate,
    pub installment_id: Option<InstallmentId>,
}

impl PaymentBody {
    pub fn into_request(self, payable_id: PayableId) -> RegisterPaymentRequest {
        RegisterPaymentRequest {
            payable_id,
            amount: self.amount.into(),
            paid_on: self.paid_on,
            installment_id: self.installment_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiptBody {
    pub amount: MoneyBody,
    pub received_on: NaiveDate,
    pub installment_id: Option<InstallmentId>,
}

impl ReceiptBody {
    pub fn into_request(
        self,
        receivable_id: core_kernel::ReceivableId,
    ) -> RegisterReceiptRequest {
        RegisterReceiptRequest {
            receivable_id,
            amount: self.amount.into(),
            received_on: self.received_on,
            installment_id: self.installment_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplyCreditBody {
    pub credit_id: CreditId,
    pub amount: MoneyBody,
    pub applied_on: NaiveDate,
    pub note: Option<String>,
}

impl ApplyCreditBody {
    pub fn into_request(self, payable_id: PayableId) -> ApplyCreditRequest {
        ApplyCreditRequest {
            credit_id: self.credit_id,
            payable_id,
            amount: self.amount.into(),
            applied_on: self.applied_on,
            note: self.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplyAdvanceBody {
    pub advance_id: AdvanceId,
    pub amount: MoneyBody,
    pub applied_on: NaiveDate,
    pub note: Option<String>,
}

impl ApplyAdvanceBody {
    pub fn into_request(self, payable_id: PayableId) -> ApplyAdvanceRequest {
        ApplyAdvanceRequest {
            advance_id: self.advance_id,
            payable_id,
            amount: self.amount.into(),
            applied_on: self.applied_on,
            note: self.note,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InstallmentPlanBody {
    pub count: u32,
    pub interval_days: i64,
    pub first_due: NaiveDate,
}

impl From<InstallmentPlanBody> for InstallmentPlan {
    fn from(body: InstallmentPlanBody) -> Self {
        InstallmentPlan {
            count: body.count,
            interval_days: body.interval_days,
            first_due: body.first_due,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTotalBody {
    pub total: MoneyBody,
}

#[derive(Debug, Deserialize)]
pub struct DeletePayableParams {
    /// When true, reverse every utilization before deleting (privileged
    /// correction path)
    #[serde(default)]
    pub reverse: bool,
}
