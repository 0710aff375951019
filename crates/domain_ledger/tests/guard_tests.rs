//! Lifecycle guard integration tests: guarded deletes and reversals

use chrono::NaiveDate;
use domain_ledger::engine::{ApplyCreditRequest, RegisterPaymentRequest};
use domain_ledger::{AdvanceStatus, CreditStatus, LedgerError, PayableStatus};
use rust_decimal_macros::dec;
use test_utils::{brl, AdvanceBuilder, CreditBuilder, LedgerFixture, PayableBuilder};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_consumed_credit_blocks_delete_until_reversed() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(1000))).build(),
        )
        .await
        .unwrap()
        .payable;
    let credit = fx
        .engine
        .create_credit(
            fx.tenant,
            CreditBuilder::new(fx.counterparty).total(brl(dec!(400))).build(),
        )
        .await
        .unwrap();

    let applied = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(400)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap();

    let err = fx.engine.delete_credit(fx.tenant, credit.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InUse { utilized } if utilized == dec!(400)));

    let reopened = fx
        .engine
        .reverse_utilization(fx.tenant, applied.utilization.id)
        .await
        .unwrap();
    assert_eq!(reopened.status, PayableStatus::Open);
    assert_eq!(reopened.pending().amount(), dec!(1000));
    assert!(reopened.credit_applied.is_zero());

    fx.engine.delete_credit(fx.tenant, credit.id).await.unwrap();
    let err = fx
        .engine
        .credit_detail(fx.tenant, credit.id, date(2024, 3, 11))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_reversal_is_the_exact_inverse() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(500))).build(),
        )
        .await
        .unwrap()
        .payable;
    let credit = fx
        .engine
        .create_credit(
            fx.tenant,
            CreditBuilder::new(fx.counterparty).total(brl(dec!(300))).build(),
        )
        .await
        .unwrap();

    let before_payable = fx
        .engine
        .payable_detail(fx.tenant, payable.id)
        .await
        .unwrap()
        .payable;
    let before_credit = fx
        .engine
        .credit_detail(fx.tenant, credit.id, date(2024, 3, 9))
        .await
        .unwrap()
        .credit;

    let applied = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(120)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap();
    fx.engine
        .reverse_utilization(fx.tenant, applied.utilization.id)
        .await
        .unwrap();

    let after_payable = fx
        .engine
        .payable_detail(fx.tenant, payable.id)
        .await
        .unwrap();
    let after_credit = fx
        .engine
        .credit_detail(fx.tenant, credit.id, date(2024, 3, 9))
        .await
        .unwrap()
        .credit;

    // Balance fields return to their pre-application snapshots exactly
    assert_eq!(after_payable.payable.total, before_payable.total);
    assert_eq!(after_payable.payable.paid, before_payable.paid);
    assert_eq!(
        after_payable.payable.credit_applied,
        before_payable.credit_applied
    );
    assert_eq!(after_payable.payable.status, before_payable.status);
    assert_eq!(after_payable.payable.settled_on, before_payable.settled_on);
    assert!(after_payable.utilizations.is_empty());

    assert_eq!(after_credit.total, before_credit.total);
    assert_eq!(after_credit.utilized, before_credit.utilized);
    assert_eq!(after_credit.status, before_credit.status);
}

#[tokio::test]
async fn test_reverse_and_delete_payable_restores_every_source() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(1000))).build(),
        )
        .await
        .unwrap()
        .payable;
    let advance = fx
        .engine
        .create_advance(
            fx.tenant,
            AdvanceBuilder::new(fx.counterparty).total(brl(dec!(600))).build(),
        )
        .await
        .unwrap();
    let credit = fx
        .engine
        .create_credit(
            fx.tenant,
            CreditBuilder::new(fx.counterparty).total(brl(dec!(400))).build(),
        )
        .await
        .unwrap();

    fx.engine
        .apply_advance(
            fx.tenant,
            domain_ledger::engine::ApplyAdvanceRequest {
                advance_id: advance.id,
                payable_id: payable.id,
                amount: brl(dec!(600)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap();
    fx.engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(400)),
                applied_on: date(2024, 3, 11),
                note: None,
            },
        )
        .await
        .unwrap();

    // Plain delete is blocked: the payable has consumed balance
    let err = fx.engine.delete_payable(fx.tenant, payable.id).await.unwrap_err();
    assert!(matches!(err, LedgerError::InUse { .. }));

    fx.engine
        .reverse_and_delete_payable(fx.tenant, payable.id)
        .await
        .unwrap();

    let advance = fx
        .engine
        .advance_detail(fx.tenant, advance.id)
        .await
        .unwrap();
    assert!(advance.advance.utilized.is_zero());
    assert_eq!(advance.advance.status, AdvanceStatus::Available);
    assert!(advance.utilizations.is_empty());

    let credit = fx
        .engine
        .credit_detail(fx.tenant, credit.id, date(2024, 3, 12))
        .await
        .unwrap();
    assert!(credit.credit.utilized.is_zero());
    assert_eq!(credit.credit.status, CreditStatus::Available);
    assert!(credit.utilizations.is_empty());

    let err = fx
        .engine
        .payable_detail(fx.tenant, payable.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_cash_payments_are_not_reversible_by_the_cascade() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(100))).build(),
        )
        .await
        .unwrap()
        .payable;
    fx.engine
        .register_payment(
            fx.tenant,
            RegisterPaymentRequest {
                payable_id: payable.id,
                amount: brl(dec!(50)),
                paid_on: date(2024, 3, 5),
                installment_id: None,
            },
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .reverse_and_delete_payable(fx.tenant, payable.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InUse { utilized } if utilized == dec!(50)));
}

#[tokio::test]
async fn test_untouched_payable_delete_removes_schedule() {
    let fx = LedgerFixture::new();

    let detail = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(600))).build(),
        )
        .await
        .unwrap();
    fx.engine
        .generate_installments(
            fx.tenant,
            domain_ledger::ObligationRef::Payable(detail.payable.id),
            domain_ledger::engine::InstallmentPlan {
                count: 2,
                interval_days: 30,
                first_due: date(2024, 4, 1),
            },
        )
        .await
        .unwrap();

    fx.engine
        .delete_payable(fx.tenant, detail.payable.id)
        .await
        .unwrap();
    let err = fx
        .engine
        .payable_detail(fx.tenant, detail.payable.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}

#[tokio::test]
async fn test_untouched_advance_delete_succeeds() {
    let fx = LedgerFixture::new();

    let advance = fx
        .engine
        .create_advance(
            fx.tenant,
            AdvanceBuilder::new(fx.counterparty).total(brl(dec!(200))).build(),
        )
        .await
        .unwrap();

    fx.engine.delete_advance(fx.tenant, advance.id).await.unwrap();
    let err = fx
        .engine
        .advance_detail(fx.tenant, advance.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { .. }));
}
