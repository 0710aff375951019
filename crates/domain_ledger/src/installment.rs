//! Installments - scheduled sub-portions of an obligation
//!
//! An installment belongs to exactly one payable or receivable. When a
//! schedule exists, the installment amounts sum to the parent's total; the
//! engine enforces this at generation time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{InstallmentId, Money, PayableId, ReceivableId, TenantId};

use crate::balance;

/// The obligation an installment belongs to (exactly one side)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ObligationRef {
    Payable(PayableId),
    Receivable(ReceivableId),
}

/// Settlement status of an installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    PartiallySettled,
    Settled,
}

impl InstallmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::PartiallySettled => "partially_settled",
            InstallmentStatus::Settled => "settled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InstallmentStatus::Pending),
            "partially_settled" => Some(InstallmentStatus::PartiallySettled),
            "settled" => Some(InstallmentStatus::Settled),
            _ => None,
        }
    }
}

/// A scheduled sub-portion of a payable or receivable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// Unique identifier
    pub id: InstallmentId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Parent obligation
    pub parent: ObligationRef,
    /// 1-based sequence number within the schedule
    pub sequence: u32,
    /// Scheduled amount
    pub amount: Money,
    /// Amount settled against this installment
    pub amount_settled: Money,
    /// Due date
    pub due_on: NaiveDate,
    /// Settlement status
    pub status: InstallmentStatus,
    /// Date the installment was fully covered
    pub settled_on: Option<NaiveDate>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    /// Creates a pending installment
    pub fn new(
        tenant_id: TenantId,
        parent: ObligationRef,
        sequence: u32,
        amount: Money,
        due_on: NaiveDate,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: InstallmentId::new_v7(),
            tenant_id,
            parent,
            sequence,
            amount,
            amount_settled: Money::zero(amount.currency()),
            due_on,
            status: InstallmentStatus::Pending,
            settled_on: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Remaining amount on this installment: `amount - amount_settled`
    pub fn remaining(&self) -> Money {
        self.amount - self.amount_settled
    }

    /// Records a settlement against this installment
    ///
    /// The engine validates `amount <= remaining()` before calling.
    pub fn record_settlement(&mut self, amount: Money, on: NaiveDate) {
        self.amount_settled = self.amount_settled + amount;
        self.status = balance::derived_installment_status(self);
        if self.status == InstallmentStatus::Settled && self.settled_on.is_none() {
            self.settled_on = Some(on);
        }
        self.updated_at = Utc::now();
    }
}
