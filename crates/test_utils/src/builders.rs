//! Request builders with sensible defaults
//!
//! Each builder produces an engine request; tests override only the fields
//! they care about.

use chrono::NaiveDate;
use core_kernel::{AdvanceId, CounterpartyId, Currency, Money, PayableId};
use domain_ledger::engine::{
    CreateAdvanceRequest, CreateCreditRequest, CreatePayableRequest, CreateReceivableRequest,
    ScheduleEntry,
};
use domain_ledger::CreditKind;
use rust_decimal_macros::dec;

fn default_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn default_due() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
}

pub struct PayableBuilder {
    request: CreatePayableRequest,
}

impl PayableBuilder {
    pub fn new(counterparty_id: CounterpartyId) -> Self {
        Self {
            request: CreatePayableRequest {
                counterparty_id,
                total: Money::new(dec!(1000), Currency::BRL),
                issued_on: default_date(),
                due_on: default_due(),
                document_number: None,
                description: None,
                note: None,
                funding_advance_id: None,
                schedule: None,
            },
        }
    }

    pub fn total(mut self, total: Money) -> Self {
        self.request.total = total;
        self
    }

    pub fn issued_on(mut self, on: NaiveDate) -> Self {
        self.request.issued_on = on;
        self
    }

    pub fn due_on(mut self, on: NaiveDate) -> Self {
        self.request.due_on = on;
        self
    }

    pub fn document_number(mut self, number: impl Into<String>) -> Self {
        self.request.document_number = Some(number.into());
        self
    }

    pub fn funded_by(mut self, advance_id: AdvanceId) -> Self {
        self.request.funding_advance_id = Some(advance_id);
        self
    }

    pub fn schedule(mut self, entries: Vec<ScheduleEntry>) -> Self {
        self.request.schedule = Some(entries);
        self
    }

    pub fn build(self) -> CreatePayableRequest {
        self.request
    }
}

pub struct ReceivableBuilder {
    request: CreateReceivableRequest,
}

impl ReceivableBuilder {
    pub fn new(counterparty_id: CounterpartyId) -> Self {
        Self {
            request: CreateReceivableRequest {
                counterparty_id,
                total: Money::new(dec!(800), Currency::BRL),
                issued_on: default_date(),
                due_on: default_due(),
                document_number: None,
                description: None,
            },
        }
    }

    pub fn total(mut self, total: Money) -> Self {
        self.request.total = total;
        self
    }

    pub fn build(self) -> CreateReceivableRequest {
        self.request
    }
}

pub struct AdvanceBuilder {
    request: CreateAdvanceRequest,
}

impl AdvanceBuilder {
    pub fn new(counterparty_id: CounterpartyId) -> Self {
        Self {
            request: CreateAdvanceRequest {
                counterparty_id,
                total: Money::new(dec!(500), Currency::BRL),
                advanced_on: default_date(),
                description: None,
            },
        }
    }

    pub fn total(mut self, total: Money) -> Self {
        self.request.total = total;
        self
    }

    pub fn advanced_on(mut self, on: NaiveDate) -> Self {
        self.request.advanced_on = on;
        self
    }

    pub fn build(self) -> CreateAdvanceRequest {
        self.request
    }
}

pub struct CreditBuilder {
    request: CreateCreditRequest,
}

impl CreditBuilder {
    pub fn new(counterparty_id: CounterpartyId) -> Self {
        Self {
            request: CreateCreditRequest {
                counterparty_id,
                kind: CreditKind::Refund,
                total: Money::new(dec!(400), Currency::BRL),
                credited_on: default_date(),
                expires_on: None,
                origin_payable_id: None,
                reason: None,
            },
        }
    }

    pub fn kind(mut self, kind: CreditKind) -> Self {
        self.request.kind = kind;
        self
    }

    pub fn total(mut self, total: Money) -> Self {
        self.request.total = total;
        self
    }

    pub fn expires_on(mut self, on: NaiveDate) -> Self {
        self.request.expires_on = Some(on);
        self
    }

    pub fn origin(mut self, payable_id: PayableId) -> Self {
        self.request.origin_payable_id = Some(payable_id);
        self
    }

    pub fn build(self) -> CreateCreditRequest {
        self.request
    }
}
