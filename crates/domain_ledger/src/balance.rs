//! Balance calculator - pure derivations over record snapshots
//!
//! Everything here is a side-effect-free function of stored totals. Statuses
//! are derived rather than trusted so that two records can never disagree
//! about how much money remains between them.

use chrono::NaiveDate;

use crate::credit::{Credit, CreditStatus};
use crate::installment::{Installment, InstallmentStatus};
use crate::payable::{Payable, PayableStatus};
use crate::receivable::{Receivable, ReceivableStatus};

/// Derives a payable's status from its stored buckets
///
/// `Settled` when nothing is pending; `PartiallySettled` when something has
/// been paid or applied but a pending amount remains; `Open` otherwise.
pub fn derived_payable_status(payable: &Payable) -> PayableStatus {
    let pending = payable.pending();
    if !pending.is_positive() {
        PayableStatus::Settled
    } else if payable.paid.is_positive() || payable.credit_applied.is_positive() {
        PayableStatus::PartiallySettled
    } else {
        PayableStatus::Open
    }
}

/// Derives a receivable's status from its received amount
pub fn derived_receivable_status(receivable: &Receivable) -> ReceivableStatus {
    if !receivable.outstanding().is_positive() {
        ReceivableStatus::Settled
    } else if receivable.received.is_positive() {
        ReceivableStatus::PartiallySettled
    } else {
        ReceivableStatus::Open
    }
}

/// Derives an installment's status from its settled amount
pub fn derived_installment_status(installment: &Installment) -> InstallmentStatus {
    if !installment.remaining().is_positive() {
        InstallmentStatus::Settled
    } else if installment.amount_settled.is_positive() {
        InstallmentStatus::PartiallySettled
    } else {
        InstallmentStatus::Pending
    }
}

/// Computes a credit's status as of a date, accounting for expiry
///
/// Expiry is evaluated at read time and is monotonic: once `as_of` passes
/// `expires_on`, an `Available` credit reports `Expired` and can never become
/// eligible again. The stored status is not touched, so no background job is
/// needed to sweep expired rows.
pub fn effective_credit_status(credit: &Credit, as_of: NaiveDate) -> CreditStatus {
    match credit.expires_on {
        Some(expires_on) if as_of > expires_on && credit.status == CreditStatus::Available => {
            CreditStatus::Expired
        }
        _ => credit.status,
    }
}
