//! Payables - obligations the tenant owes a counterparty
//!
//! A payable tracks three stored buckets (`total`, `paid`, `credit_applied`);
//! the pending amount is always derived, so the conservation invariant
//! `total = paid + pending + credit_applied` holds by construction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AdvanceId, CounterpartyId, Currency, Money, PayableId, TenantId};

use crate::balance;

/// Settlement status of a payable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableStatus {
    /// Nothing paid or applied yet
    Open,
    /// Some amount paid or covered by credit, pending remains
    PartiallySettled,
    /// Pending amount reached zero
    Settled,
}

impl PayableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayableStatus::Open => "open",
            PayableStatus::PartiallySettled => "partially_settled",
            PayableStatus::Settled => "settled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "open" => Some(PayableStatus::Open),
            "partially_settled" => Some(PayableStatus::PartiallySettled),
            "settled" => Some(PayableStatus::Settled),
            _ => None,
        }
    }
}

/// An obligation owed by the tenant to a counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payable {
    /// Unique identifier
    pub id: PayableId,
    /// Owning tenant (always supplied by the caller, never inferred)
    pub tenant_id: TenantId,
    /// Counterparty the amount is owed to
    pub counterparty_id: CounterpartyId,
    /// Document number (invoice/duplicata number)
    pub document_number: Option<String>,
    /// Free-form description
    pub description: Option<String>,
    /// Total obligation amount
    pub total: Money,
    /// Amount settled by direct payment
    pub paid: Money,
    /// Amount settled by applied advances/credits
    pub credit_applied: Money,
    /// Issue date
    pub issued_on: NaiveDate,
    /// Due date
    pub due_on: NaiveDate,
    /// Settlement status
    pub status: PayableStatus,
    /// Funding advance linked at creation, if any
    pub advance_id: Option<AdvanceId>,
    /// Date the pending amount reached zero
    pub settled_on: Option<NaiveDate>,
    /// Notes
    pub note: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Payable {
    /// Creates a new open payable with nothing settled
    pub fn new(
        tenant_id: TenantId,
        counterparty_id: CounterpartyId,
        total: Money,
        issued_on: NaiveDate,
        due_on: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        let currency = total.currency();

        Self {
            id: PayableId::new_v7(),
            tenant_id,
            counterparty_id,
            document_number: None,
            description: None,
            total,
            paid: Money::zero(currency),
            credit_applied: Money::zero(currency),
            issued_on,
            due_on,
            status: PayableStatus::Open,
            advance_id: None,
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

    /// Sets the note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Returns the record's currency
    pub fn currency(&self) -> Currency {
        self.total.currency()
    }

    /// Derived pending amount: `total - paid - credit_applied`
    pub fn pending(&self) -> Money {
        self.total - self.paid - self.credit_applied
    }

    /// Records a direct cash payment
    ///
    /// The caller (engine) has already validated that `amount` is positive,
    /// in the record's currency, and within the pending amount.
    pub fn record_payment(&mut self, amount: Money, on: NaiveDate) {
        self.paid = self.paid + amount;
        self.refresh_status(on);
    }

    /// Records an applied advance/credit amount
    pub fn apply_funding(&mut self, amount: Money, on: NaiveDate) {
        self.credit_applied = self.credit_applied + amount;
        self.refresh_status(on);
    }

    /// Reverses a previously applied funding amount
    ///
    /// Used only by the lifecycle guard's reversal path; reopens the payable
    /// when the pending amount becomes positive again.
    pub fn reverse_funding(&mut self, amount: Money) {
        self.credit_applied = self.credit_applied - amount;
        self.status = balance::derived_payable_status(self);
        if self.status != PayableStatus::Settled {
            self.settled_on = None;
        }
        self.updated_at = Utc::now();
    }

    fn refresh_status(&mut self, on: NaiveDate) {
        self.status = balance::derived_payable_status(self);
        if self.status == PayableStatus::Settled && self.settled_on.is_none() {
            self.settled_on = Some(on);
        }
        self.updated_at = Utc::now();
    }
}
