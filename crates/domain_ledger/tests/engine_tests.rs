//! Engine integration tests over the in-memory store

use chrono::NaiveDate;
use core_kernel::{CounterpartyId, Currency, Money};
use domain_ledger::engine::{
    ApplyCreditRequest, InstallmentPlan, RegisterPaymentRequest, RegisterReceiptRequest,
    ScheduleEntry,
};
use domain_ledger::{
    CreditStatus, LedgerError, ObligationRef, PayableStatus, ReceivableStatus,
};
use rust_decimal_macros::dec;
use test_utils::{brl, usd, AdvanceBuilder, CreditBuilder, LedgerFixture, PayableBuilder, ReceivableBuilder};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[tokio::test]
async fn test_credit_application_then_payment_settles_payable() {
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

    assert_eq!(applied.payable.pending().amount(), dec!(600));
    assert_eq!(applied.payable.credit_applied.amount(), dec!(400));
    assert_eq!(applied.payable.status, PayableStatus::PartiallySettled);
    assert_eq!(applied.credit.utilized.amount(), dec!(400));
    assert_eq!(applied.credit.status, CreditStatus::Utilized);

    let paid = fx
        .engine
        .register_payment(
            fx.tenant,
            RegisterPaymentRequest {
                payable_id: payable.id,
                amount: brl(dec!(600)),
                paid_on: date(2024, 3, 20),
                installment_id: None,
            },
        )
        .await
        .unwrap();

    assert!(paid.payable.pending().is_zero());
    assert_eq!(paid.payable.paid.amount(), dec!(600));
    assert_eq!(paid.payable.status, PayableStatus::Settled);
    assert_eq!(paid.payable.settled_on, Some(date(2024, 3, 20)));
    assert_eq!(
        paid.payable.total.amount(),
        paid.payable.paid.amount()
            + paid.payable.pending().amount()
            + paid.payable.credit_applied.amount()
    );
}

#[tokio::test]
async fn test_fully_utilized_credit_rejects_further_application() {
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

    fx.engine
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

    let before_credit = fx
        .engine
        .credit_detail(fx.tenant, credit.id, date(2024, 3, 11))
        .await
        .unwrap()
        .credit;
    let before_payable = fx
        .engine
        .payable_detail(fx.tenant, payable.id)
        .await
        .unwrap()
        .payable;

    // Source eligibility fires before the balance comparison
    let err = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(1)),
                applied_on: date(2024, 3, 11),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CreditUnavailable { .. }));

    // Rejected calls leave both sides bit-identical
    let after_credit = fx
        .engine
        .credit_detail(fx.tenant, credit.id, date(2024, 3, 11))
        .await
        .unwrap()
        .credit;
    let after_payable = fx
        .engine
        .payable_detail(fx.tenant, payable.id)
        .await
        .unwrap()
        .payable;
    assert_eq!(before_credit, after_credit);
    assert_eq!(before_payable, after_payable);
}

#[tokio::test]
async fn test_partial_credit_rejects_overdraw_with_insufficient_balance() {
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

    fx.engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(150)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(300)),
                applied_on: date(2024, 3, 11),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientBalance { available, requested }
            if available == dec!(250) && requested == dec!(300)
    ));
}

#[tokio::test]
async fn test_counterparty_gating_fires_even_with_valid_amounts() {
    let fx = LedgerFixture::new();
    let other_counterparty = CounterpartyId::new();

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
            CreditBuilder::new(other_counterparty).total(brl(dec!(500))).build(),
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(100)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::CounterpartyMismatch { .. }));
}

#[tokio::test]
async fn test_currency_gating() {
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
            CreditBuilder::new(fx.counterparty).total(usd(dec!(500))).build(),
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: usd(dec!(100)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::CurrencyMismatch {
            source_currency: Currency::USD,
            target_currency: Currency::BRL
        }
    ));
}

#[tokio::test]
async fn test_expired_credit_rejected_without_stored_status_change() {
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
            CreditBuilder::new(fx.counterparty)
                .total(brl(dec!(200)))
                .expires_on(date(2024, 3, 31))
                .build(),
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(100)),
                applied_on: date(2024, 4, 1),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::CreditUnavailable { status, .. } if status == "expired"
    ));

    let detail = fx
        .engine
        .credit_detail(fx.tenant, credit.id, date(2024, 4, 1))
        .await
        .unwrap();
    assert_eq!(detail.credit.status, CreditStatus::Available);
    assert_eq!(detail.effective_status, CreditStatus::Expired);
}

#[tokio::test]
async fn test_tenant_scoping_hides_foreign_rows() {
    let fx = LedgerFixture::new();
    let other = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(fx.tenant, PayableBuilder::new(fx.counterparty).build())
        .await
        .unwrap()
        .payable;

    let err = fx
        .engine
        .payable_detail(other.tenant, payable.id)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::NotFound { entity: "payable", .. }));
}

#[tokio::test]
async fn test_payment_against_installment_settles_it_first() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(900))).build(),
        )
        .await
        .unwrap()
        .payable;
    let installments = fx
        .engine
        .generate_installments(
            fx.tenant,
            ObligationRef::Payable(payable.id),
            InstallmentPlan {
                count: 3,
                interval_days: 30,
                first_due: date(2024, 4, 1),
            },
        )
        .await
        .unwrap();
    assert_eq!(installments.len(), 3);
    let total: rust_decimal::Decimal = installments.iter().map(|i| i.amount.amount()).sum();
    assert_eq!(total, dec!(900));
    assert_eq!(installments[1].due_on, date(2024, 5, 1));

    let first = &installments[0];
    let outcome = fx
        .engine
        .register_payment(
            fx.tenant,
            RegisterPaymentRequest {
                payable_id: payable.id,
                amount: first.amount,
                paid_on: date(2024, 3, 28),
                installment_id: Some(first.id),
            },
        )
        .await
        .unwrap();

    let settled = outcome.installment.unwrap();
    assert!(settled.remaining().is_zero());
    assert_eq!(settled.settled_on, Some(date(2024, 3, 28)));
    assert_eq!(outcome.payable.status, PayableStatus::PartiallySettled);

    // The same installment cannot absorb another payment
    let err = fx
        .engine
        .register_payment(
            fx.tenant,
            RegisterPaymentRequest {
                payable_id: payable.id,
                amount: brl(dec!(1)),
                paid_on: date(2024, 3, 29),
                installment_id: Some(first.id),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::AlreadySettled { entity: "installment", .. }
    ));
}

#[tokio::test]
async fn test_settled_payable_rejects_further_payment() {
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
                amount: brl(dec!(100)),
                paid_on: date(2024, 3, 5),
                installment_id: None,
            },
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .register_payment(
            fx.tenant,
            RegisterPaymentRequest {
                payable_id: payable.id,
                amount: brl(dec!(1)),
                paid_on: date(2024, 3, 6),
                installment_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::AlreadySettled { entity: "payable", .. }
    ));
}

#[tokio::test]
async fn test_overpayment_rejected_with_exceeds_pending() {
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

    let err = fx
        .engine
        .register_payment(
            fx.tenant,
            RegisterPaymentRequest {
                payable_id: payable.id,
                amount: brl(dec!(150)),
                paid_on: date(2024, 3, 5),
                installment_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::ExceedsPending { pending, requested }
            if pending == dec!(100) && requested == dec!(150)
    ));
}

#[tokio::test]
async fn test_receipt_mirrors_payment() {
    let fx = LedgerFixture::new();

    let receivable = fx
        .engine
        .create_receivable(
            fx.tenant,
            ReceivableBuilder::new(fx.counterparty).total(brl(dec!(800))).build(),
        )
        .await
        .unwrap();

    let outcome = fx
        .engine
        .register_receipt(
            fx.tenant,
            RegisterReceiptRequest {
                receivable_id: receivable.id,
                amount: brl(dec!(800)),
                received_on: date(2024, 3, 15),
                installment_id: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.receivable.status, ReceivableStatus::Settled);
    assert!(outcome.receivable.outstanding().is_zero());
    assert_eq!(outcome.receivable.settled_on, Some(date(2024, 3, 15)));
}

#[tokio::test]
async fn test_advance_funding_at_creation_conserves_both_sides() {
    let fx = LedgerFixture::new();

    let advance = fx
        .engine
        .create_advance(
            fx.tenant,
            AdvanceBuilder::new(fx.counterparty).total(brl(dec!(2000))).build(),
        )
        .await
        .unwrap();

    let detail = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty)
                .total(brl(dec!(1500)))
                .funded_by(advance.id)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(detail.payable.status, PayableStatus::Settled);
    assert_eq!(detail.payable.credit_applied.amount(), dec!(1500));
    assert_eq!(detail.payable.advance_id, Some(advance.id));
    assert_eq!(detail.utilizations.len(), 1);

    let advance = fx.engine.advance_detail(fx.tenant, advance.id).await.unwrap();
    assert_eq!(advance.advance.utilized.amount(), dec!(1500));
    assert_eq!(advance.available.amount(), dec!(500));
}

#[tokio::test]
async fn test_advance_funding_rejected_when_too_small() {
    let fx = LedgerFixture::new();

    let advance = fx
        .engine
        .create_advance(
            fx.tenant,
            AdvanceBuilder::new(fx.counterparty).total(brl(dec!(100))).build(),
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty)
                .total(brl(dec!(1500)))
                .funded_by(advance.id)
                .build(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InsufficientBalance { .. }));

    // Nothing was created on the failure path
    let detail = fx.engine.advance_detail(fx.tenant, advance.id).await.unwrap();
    assert!(detail.utilizations.is_empty());
    assert!(detail.advance.utilized.is_zero());
}

#[tokio::test]
async fn test_explicit_schedule_must_sum_to_total() {
    let fx = LedgerFixture::new();

    let err = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty)
                .total(brl(dec!(300)))
                .schedule(vec![
                    ScheduleEntry {
                        amount: brl(dec!(100)),
                        due_on: date(2024, 4, 1),
                    },
                    ScheduleEntry {
                        amount: brl(dec!(150)),
                        due_on: date(2024, 5, 1),
                    },
                ])
                .build(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSchedule { .. }));
}

#[tokio::test]
async fn test_generated_schedule_spreads_remainder_over_earliest() {
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

    let installments = fx
        .engine
        .generate_installments(
            fx.tenant,
            ObligationRef::Payable(payable.id),
            InstallmentPlan {
                count: 3,
                interval_days: 30,
                first_due: date(2024, 4, 1),
            },
        )
        .await
        .unwrap();

    let amounts: Vec<_> = installments.iter().map(|i| i.amount.amount()).collect();
    assert_eq!(amounts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);

    // A second schedule on the same parent is rejected
    let err = fx
        .engine
        .generate_installments(
            fx.tenant,
            ObligationRef::Payable(payable.id),
            InstallmentPlan {
                count: 2,
                interval_days: 30,
                first_due: date(2024, 4, 1),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSchedule { .. }));
}

#[tokio::test]
async fn test_sub_unit_total_cannot_be_split_into_installments() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(100.005))).build(),
        )
        .await
        .unwrap()
        .payable;

    // 100.005 cannot reassemble exactly from centavos
    let err = fx
        .engine
        .generate_installments(
            fx.tenant,
            ObligationRef::Payable(payable.id),
            InstallmentPlan {
                count: 2,
                interval_days: 30,
                first_due: date(2024, 4, 1),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSchedule { .. }));

    let detail = fx
        .engine
        .payable_detail(fx.tenant, payable.id)
        .await
        .unwrap();
    assert!(detail.installments.is_empty());
}

#[tokio::test]
async fn test_out_of_range_schedule_plans_are_rejected() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty).total(brl(dec!(1200))).build(),
        )
        .await
        .unwrap()
        .payable;

    let plans = [
        // Would overflow the due-date arithmetic
        InstallmentPlan {
            count: 2,
            interval_days: i64::MAX,
            first_due: date(2024, 4, 1),
        },
        InstallmentPlan {
            count: 2,
            interval_days: 0,
            first_due: date(2024, 4, 1),
        },
        InstallmentPlan {
            count: 100_000,
            interval_days: 30,
            first_due: date(2024, 4, 1),
        },
    ];
    for plan in plans {
        let err = fx
            .engine
            .generate_installments(fx.tenant, ObligationRef::Payable(payable.id), plan)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidSchedule { .. }));
    }
}

#[tokio::test]
async fn test_advance_funding_and_schedule_cannot_combine() {
    let fx = LedgerFixture::new();

    let advance = fx
        .engine
        .create_advance(
            fx.tenant,
            AdvanceBuilder::new(fx.counterparty).total(brl(dec!(1000))).build(),
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .create_payable(
            fx.tenant,
            PayableBuilder::new(fx.counterparty)
                .total(brl(dec!(1000)))
                .funded_by(advance.id)
                .schedule(vec![
                    ScheduleEntry {
                        amount: brl(dec!(500)),
                        due_on: date(2024, 4, 1),
                    },
                    ScheduleEntry {
                        amount: brl(dec!(500)),
                        due_on: date(2024, 5, 1),
                    },
                ])
                .build(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidSchedule { .. }));

    // The rejected create consumed nothing from the advance
    let detail = fx
        .engine
        .advance_detail(fx.tenant, advance.id)
        .await
        .unwrap();
    assert!(detail.advance.utilized.is_zero());
}

#[tokio::test]
async fn test_shrinking_totals_below_consumption_is_rejected() {
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

    fx.engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(200)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap();

    let err = fx
        .engine
        .update_credit_total(fx.tenant, credit.id, brl(dec!(150)))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InUse { utilized } if utilized == dec!(200)));

    let updated = fx
        .engine
        .update_credit_total(fx.tenant, credit.id, brl(dec!(250)))
        .await
        .unwrap();
    assert_eq!(updated.available().amount(), dec!(50));
}

#[tokio::test]
async fn test_zero_amount_rejected_before_anything_else() {
    let fx = LedgerFixture::new();

    let payable = fx
        .engine
        .create_payable(fx.tenant, PayableBuilder::new(fx.counterparty).build())
        .await
        .unwrap()
        .payable;
    let credit = fx
        .engine
        .create_credit(fx.tenant, CreditBuilder::new(fx.counterparty).build())
        .await
        .unwrap();

    let err = fx
        .engine
        .apply_credit(
            fx.tenant,
            ApplyCreditRequest {
                credit_id: credit.id,
                payable_id: payable.id,
                amount: brl(dec!(0)),
                applied_on: date(2024, 3, 10),
                note: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAmount { .. }));
}
