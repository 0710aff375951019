//! Advances - prepayments held against a counterparty
//!
//! An advance is money already sent to a supplier that has not yet been tied
//! to any obligation. It is consumed only through the reconciliation engine,
//! one utilization at a time, and can never be consumed past its total.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AdvanceId, CounterpartyId, Currency, Money, TenantId};

/// Nominal status of an advance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    /// Balance remains to apply
    Available,
    /// Fully consumed
    Utilized,
}

impl AdvanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvanceStatus::Available => "available",
            AdvanceStatus::Utilized => "utilized",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(AdvanceStatus::Available),
            "utilized" => Some(AdvanceStatus::Utilized),
            _ => None,
        }
    }
}

/// A prepayment to a counterparty, held until consumed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advance {
    /// Unique identifier
    pub id: AdvanceId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Counterparty the prepayment was sent to
    pub counterparty_id: CounterpartyId,
    /// Total prepaid amount
    pub total: Money,
    /// Amount already applied to payables
    pub utilized: Money,
    /// Date the prepayment was made
    pub advanced_on: NaiveDate,
    /// Free-form description
    pub description: Option<String>,
    /// Nominal status
    pub status: AdvanceStatus,
    /// Notes
    pub note: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Advance {
    /// Creates a new fully available advance
    pub fn new(
        tenant_id: TenantId,
        counterparty_id: CounterpartyId,
        total: Money,
        advanced_on: NaiveDate,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: AdvanceId::new_v7(),
            tenant_id,
            counterparty_id,
            total,
            utilized: Money::zero(total.currency()),
            advanced_on,
            description: None,
            status: AdvanceStatus::Available,
            note: None,
            created_at: now,
            updated_at: now,
        }
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

    /// Remaining balance: `total - utilized`
    pub fn available(&self) -> Money {
        self.total - self.utilized
    }

    /// Consumes part of the balance
    ///
    /// The engine validates `amount <= available()` before calling.
    pub fn record_utilization(&mut self, amount: Money) {
        self.utilized = self.utilized + amount;
        if self.available().is_zero() {
            self.status = AdvanceStatus::Utilized;
        }
        self.updated_at = Utc::now();
    }

    /// Returns a previously consumed amount to the balance
    pub fn reverse_utilization(&mut self, amount: Money) {
        let next = self.utilized - amount;
        self.utilized = if next.is_negative() {
            Money::zero(self.currency())
        } else {
            next
        };
        if self.available().is_positive() {
            self.status = AdvanceStatus::Available;
        }
        self.updated_at = Utc::now();
    }

    /// Raises or lowers the total; lowering below `utilized` is the engine's
    /// job to reject
    pub fn set_total(&mut self, total: Money) {
        self.total = total;
        self.status = if self.available().is_positive() {
            AdvanceStatus::Available
        } else {
            AdvanceStatus::Utilized
        };
        self.updated_at = Utc::now();
    }
}
