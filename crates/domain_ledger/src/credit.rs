//! Credits - standalone balances owed to the tenant
//!
//! A credit is a balance a counterparty owes back (refund, overpayment,
//! promotional goodwill) that can be applied against that counterparty's
//! payables. Unlike an advance it may carry an expiry date: expiry is a
//! read-time property computed by [`Credit::effective_status`], never a
//! stored-status rewrite, so no background job is needed and an expired
//! credit can never flip back to eligible.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{CounterpartyId, CreditId, Currency, Money, PayableId, TenantId};

/// Origin of a credit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditKind {
    /// Refund for a cancelled or reduced service
    Refund,
    /// Counterparty was overpaid
    Overpayment,
    /// Promotional balance granted by the counterparty
    Promotional,
    /// Anything else
    Other,
}

impl CreditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditKind::Refund => "refund",
            CreditKind::Overpayment => "overpayment",
            CreditKind::Promotional => "promotional",
            CreditKind::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "refund" => Some(CreditKind::Refund),
            "overpayment" => Some(CreditKind::Overpayment),
            "promotional" => Some(CreditKind::Promotional),
            "other" => Some(CreditKind::Other),
            _ => None,
        }
    }
}

/// Status of a credit
///
/// `Expired` is only ever produced by [`Credit::effective_status`]; the
/// stored status moves between `Available` and `Utilized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    Available,
    Utilized,
    Expired,
}

impl CreditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::Available => "available",
            CreditStatus::Utilized => "utilized",
            CreditStatus::Expired => "expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "available" => Some(CreditStatus::Available),
            "utilized" => Some(CreditStatus::Utilized),
            "expired" => Some(CreditStatus::Expired),
            _ => None,
        }
    }
}

/// A standalone balance owed to the tenant by a counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credit {
    /// Unique identifier
    pub id: CreditId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Counterparty that owes the balance
    pub counterparty_id: CounterpartyId,
    /// Origin of the credit
    pub kind: CreditKind,
    /// Total credit amount
    pub total: Money,
    /// Amount already applied to payables
    pub utilized: Money,
    /// Date the credit was granted
    pub credited_on: NaiveDate,
    /// Last day the credit may be applied, if limited
    pub expires_on: Option<NaiveDate>,
    /// Payable that originated the credit (refund case)
    pub origin_payable_id: Option<PayableId>,
    /// Why the credit exists
    pub reason: Option<String>,
    /// Stored status (never `Expired`; see `effective_status`)
    pub status: CreditStatus,
    /// Notes
    pub note: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Credit {
    /// Creates a new fully available credit
    pub fn new(
        tenant_id: TenantId,
        counterparty_id: CounterpartyId,
        kind: CreditKind,
        total: Money,
        credited_on: NaiveDate,
    ) -> Self {
        let now = Utc::now();

        Self {
            id: CreditId::new_v7(),
            tenant_id,
            counterparty_id,
            kind,
            total,
            utilized: Money::zero(total.currency()),
            credited_on,
            expires_on: None,
            origin_payable_id: None,
            reason: None,
            status: CreditStatus::Available,
            note: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the expiry date
    pub fn with_expiry(mut self, expires_on: NaiveDate) -> Self {
        self.expires_on = Some(expires_on);
        self
    }

    /// Sets the originating payable
    pub fn with_origin(mut self, payable_id: PayableId) -> Self {
        self.origin_payable_id = Some(payable_id);
        self
    }

    /// Sets the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
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

    /// Status as of a given date, accounting for expiry
    ///
    /// Returns `Expired` when the expiry date has passed and the stored
    /// status is still `Available`; otherwise returns the stored status.
    /// Never mutates the record.
    pub fn effective_status(&self, as_of: NaiveDate) -> CreditStatus {
        crate::balance::effective_credit_status(self, as_of)
    }

    /// Consumes part of the balance
    ///
    /// The engine validates availability and amount before calling.
    pub fn record_utilization(&mut self, amount: Money) {
        self.utilized = self.utilized + amount;
        if self.available().is_zero() {
            self.status = CreditStatus::Utilized;
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
            self.status = CreditStatus::Available;
        }
        self.updated_at = Utc::now();
    }

    /// Raises or lowers the total; lowering below `utilized` is the engine's
    /// job to reject
    pub fn set_total(&mut self, total: Money) {
        self.total = total;
        self.status = if self.available().is_positive() {
            CreditStatus::Available
        } else {
            CreditStatus::Utilized
        };
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_credit(total: Money) -> Credit {
        Credit::new(
            TenantId::new(),
            CounterpartyId::new(),
            CreditKind::Refund,
            total,
            date(2024, 1, 10),
        )
    }

    #[test]
    fn test_effective_status_respects_expiry_without_mutation() {
        let credit =
            test_credit(Money::new(dec!(300), Currency::BRL)).with_expiry(date(2024, 6, 30));

        assert_eq!(
            credit.effective_status(date(2024, 6, 30)),
            CreditStatus::Available
        );
        assert_eq!(
            credit.effective_status(date(2024, 7, 1)),
            CreditStatus::Expired
        );
        // Stored status is untouched by the read
        assert_eq!(credit.status, CreditStatus::Available);
    }

    #[test]
    fn test_utilized_credit_reports_utilized_even_past_expiry() {
        let mut credit =
            test_credit(Money::new(dec!(300), Currency::BRL)).with_expiry(date(2024, 6, 30));
        credit.record_utilization(Money::new(dec!(300), Currency::BRL));

        assert_eq!(credit.status, CreditStatus::Utilized);
        assert_eq!(
            credit.effective_status(date(2024, 7, 1)),
            CreditStatus::Utilized
        );
    }

    #[test]
    fn test_set_total_restores_availability() {
        let mut credit = test_credit(Money::new(dec!(200), Currency::BRL));
        credit.record_utilization(Money::new(dec!(200), Currency::BRL));
        assert_eq!(credit.status, CreditStatus::Utilized);

        credit.set_total(Money::new(dec!(250), Currency::BRL));
        assert_eq!(credit.status, CreditStatus::Available);
        assert_eq!(credit.available().amount(), dec!(50));
    }
}
