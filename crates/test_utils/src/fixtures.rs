//! Ready-made fixtures

use std::sync::Arc;

use core_kernel::{CounterpartyId, Currency, Money, TenantId};
use domain_ledger::{MemoryLedgerStore, ReconciliationEngine};
use rust_decimal::Decimal;

/// BRL money from a decimal value
pub fn brl(amount: Decimal) -> Money {
    Money::new(amount, Currency::BRL)
}

/// USD money from a decimal value
pub fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

/// An engine over a fresh in-memory store, with one tenant and counterparty
pub struct LedgerFixture {
    pub engine: ReconciliationEngine,
    pub tenant: TenantId,
    pub counterparty: CounterpartyId,
}

impl LedgerFixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryLedgerStore::new());
        Self {
            engine: ReconciliationEngine::new(store),
            tenant: TenantId::new(),
            counterparty: CounterpartyId::new(),
        }
    }
}

impl Default for LedgerFixture {
    fn default() -> Self {
        Self::new()
    }
}
