//! Utilizations - the append-only audit trail of applied balances
//!
//! A utilization records that a specific amount of one advance *or* one
//! credit (never both, enforced by the [`FundingSource`] enum) was applied to
//! one payable on a given date. Rows are inserted on apply and deleted on
//! reversal; they are never updated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{AdvanceId, CreditId, Money, PayableId, TenantId, UtilizationId};

/// The balance a utilization draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FundingSource {
    Advance(AdvanceId),
    Credit(CreditId),
}

/// An immutable record of applying part of an advance/credit to a payable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    /// Unique identifier
    pub id: UtilizationId,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// The advance or credit that was drawn down
    pub source: FundingSource,
    /// The payable the amount was applied to
    pub payable_id: PayableId,
    /// Applied amount
    pub amount: Money,
    /// Date of application
    pub applied_on: NaiveDate,
    /// Notes
    pub note: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Utilization {
    /// Creates a new utilization record
    pub fn new(
        tenant_id: TenantId,
        source: FundingSource,
        payable_id: PayableId,
        amount: Money,
        applied_on: NaiveDate,
        note: Option<String>,
    ) -> Self {
        Self {
            id: UtilizationId::new_v7(),
            tenant_id,
            source,
            payable_id,
            amount,
            applied_on,
            note,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_funding_source_serde_shape() {
        let source = FundingSource::Credit(CreditId::new());
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["kind"], "credit");
        assert!(json["id"].is_string());
    }

    #[test]
    fn test_utilization_construction() {
        let util = Utilization::new(
            TenantId::new(),
            FundingSource::Advance(AdvanceId::new()),
            PayableId::new(),
            Money::new(dec!(150), Currency::BRL),
            NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            Some("partial application".to_string()),
        );

        assert_eq!(util.amount.amount(), dec!(150));
        assert!(matches!(util.source, FundingSource::Advance(_)));
    }
}
