//! Receivables - amounts owed to the tenant
//!
//! The mirror of [`crate::payable::Payable`]: the settled bucket is
//! `received` and the derived remainder is `outstanding`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CounterpartyId, Currency, Money, ReceivableId, TenantId};

use crate::balance;

/// Settlement status of a receivable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceivableStatus {
    Open,
    PartiallySettled,
    Settled,
}

impl ReceivableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceivableStatus::Open => "open",
            ReceivableStatus::PartiallySettled => "partially_settled",
            ReceivableStatus::Settled => "settled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(ReceivableStatus::Open),
            "partially_settled" => Some(ReceivableStatus::PartiallySettled),
            "settled" => Some(ReceivableStatus::Settled),
            _ => None,
        }
    }
}

/// Money owed to the tenant by a counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receivable {
    /// Unique identifier
    pub id: ReceivableId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Counterparty that owes the amount
    pub counterparty_id: CounterpartyId,
    /// Document number
    pub document_number: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Total amount owed
    pub total: Money,
    /// Amount received so far
    pub received: Money,
    /// Issue date
    pub issued_on: NaiveDate,
    /// Due date
    pub due_on: NaiveDate,
    /// Settlement status
    pub status: ReceivableStatus,
    /// Date the outstanding amount reached zero
    pub settled_on: Option<NaiveDate>,
    /// Notes
    pub note: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Receivable {
    /// Creates a new open receivable
    pub fn new(
        tenant_id: TenantId,
        counterparty_id: CounterpartyId,
        total: Money,
        issued_on: NaiveDate,
        due_on: NaiveDate,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: ReceivableId::new_v7(),
            tenant_id,
            counterparty_id,
            document_number: None,
            description: None,
            total,
            received: Money::zero(total.currency()),
            issued_on,
            due_on,
            status: ReceivableStatus::Open,
            settled_on: None,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the document number
    pub fn with_document_number(mut self, number: impl Into<String>) -> Self {
        self.document_number = Some(number.into());
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Returns the record's currency
    pub fn currency(&self) -> Currency {
        self.total.currency()
    }

    /// Derived outstanding amount: `total - received`
    pub fn outstanding(&self) -> Money {
        self.total - self.received
    }

    /// Records an incoming payment
    pub fn record_receipt(&mut self, amount: Money, on: NaiveDate) {
        self.received = self.received + amount;
        self.status = balance::derived_receivable_status(self);
        if self.status == ReceivableStatus::Settled && self.settled_on.is_none() {
            self.settled_on = Some(on);
        }
        self.updated_at = Utc::now();
    }
}
