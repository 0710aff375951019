//! In-memory ledger store
//!
//! Reference implementation of [`LedgerStore`] used by unit tests and the
//! interface-level test harness. Transactions are fully serialized: `begin`
//! takes the single state lock and works on a clone, so a dropped or rolled
//! back transaction leaves no trace and two transactions can never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use core_kernel::{
    AdvanceId, CreditId, InstallmentId, PayableId, ReceivableId, TenantId, UtilizationId,
};

use crate::advance::Advance;
use crate::credit::Credit;
use crate::installment::{Installment, ObligationRef};
use crate::payable::Payable;
use crate::receivable::Receivable;
use crate::store::{LedgerStore, LedgerTx, StoreError};
use crate::utilization::{FundingSource, Utilization};

#[derive(Debug, Default, Clone)]
struct State {
    payables: HashMap<PayableId, Payable>,
    receivables: HashMap<ReceivableId, Receivable>,
    installments: HashMap<InstallmentId, Installment>,
    advances: HashMap<AdvanceId, Advance>,
    credits: HashMap<CreditId, Credit>,
    utilizations: HashMap<UtilizationId, Utilization>,
}

/// A [`LedgerStore`] backed by process memory
#[derive(Debug, Default, Clone)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<State>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryLedgerTx { guard, work }))
    }
}

/// One serialized transaction over a working copy of the state
struct MemoryLedgerTx {
    guard: OwnedMutexGuard<State>,
    work: State,
}

fn scoped<T: Clone>(row: Option<&T>, owner: impl Fn(&T) -> TenantId, tenant: TenantId) -> Option<T> {
    row.filter(|r| owner(r) == tenant).cloned()
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn payable(
        &mut self,
        tenant: TenantId,
        id: PayableId,
    ) -> Result<Option<Payable>, StoreError> {
        Ok(scoped(self.work.payables.get(&id), |p| p.tenant_id, tenant))
    }

    async fn insert_payable(&mut self, payable: &Payable) -> Result<(), StoreError> {
        self.work.payables.insert(payable.id, payable.clone());
        Ok(())
    }

    async fn update_payable(&mut self, payable: &Payable) -> Result<(), StoreError> {
        self.work.payables.insert(payable.id, payable.clone());
        Ok(())
    }

    async fn delete_payable(&mut self, tenant: TenantId, id: PayableId) -> Result<(), StoreError> {
        if self
            .work
            .payables
            .get(&id)
            .is_some_and(|p| p.tenant_id == tenant)
        {
            self.work.payables.remove(&id);
        }
        Ok(())
    }

    async fn receivable(
        &mut self,
        tenant: TenantId,
        id: ReceivableId,
    ) -> Result<Option<Receivable>, StoreError> {
        Ok(scoped(
            self.work.receivables.get(&id),
            |r| r.tenant_id,
            tenant,
        ))
    }

    async fn insert_receivable(&mut self, receivable: &Receivable) -> Result<(), StoreError> {
        self.work
            .receivables
            .insert(receivable.id, receivable.clone());
        Ok(())
    }

    async fn update_receivable(&mut self, receivable: &Receivable) -> Result<(), StoreError> {
        self.work
            .receivables
            .insert(receivable.id, receivable.clone());
        Ok(())
    }

    async fn delete_receivable(
        &mut self,
        tenant: TenantId,
        id: ReceivableId,
    ) -> Result<(), StoreError> {
        if self
            .work
            .receivables
            .get(&id)
            .is_some_and(|r| r.tenant_id == tenant)
        {
            self.work.receivables.remove(&id);
        }
        Ok(())
    }

    async fn installment(
        &mut self,
        tenant: TenantId,
        id: InstallmentId,
    ) -> Result<Option<Installment>, StoreError> {
        Ok(scoped(
            self.work.installments.get(&id),
            |i| i.tenant_id,
            tenant,
        ))
    }

    async fn insert_installment(&mut self, installment: &Installment) -> Result<(), StoreError> {
        self.work
            .installments
            .insert(installment.id, installment.clone());
        Ok(())
    }

    async fn update_installment(&mut self, installment: &Installment) -> Result<(), StoreError> {
        self.work
            .installments
            .insert(installment.id, installment.clone());
        Ok(())
    }

    async fn installments_for(
        &mut self,
        tenant: TenantId,
        parent: ObligationRef,
    ) -> Result<Vec<Installment>, StoreError> {
        let mut rows: Vec<Installment> = self
            .work
            .installments
            .values()
            .filter(|i| i.tenant_id == tenant && i.parent == parent)
            .cloned()
            .collect();
        rows.sort_by_key(|i| i.sequence);
        Ok(rows)
    }

    async fn delete_installments_for(
        &mut self,
        tenant: TenantId,
        parent: ObligationRef,
    ) -> Result<(), StoreError> {
        self.work
            .installments
            .retain(|_, i| !(i.tenant_id == tenant && i.parent == parent));
        Ok(())
    }

    async fn advance(
        &mut self,
        tenant: TenantId,
        id: AdvanceId,
    ) -> Result<Option<Advance>, StoreError> {
        Ok(scoped(self.work.advances.get(&id), |a| a.tenant_id, tenant))
    }

    async fn insert_advance(&mut self, advance: &Advance) -> Result<(), StoreError> {
        self.work.advances.insert(advance.id, advance.clone());
        Ok(())
    }

    async fn update_advance(&mut self, advance: &Advance) -> Result<(), StoreError> {
        self.work.advances.insert(advance.id, advance.clone());
        Ok(())
    }

    async fn delete_advance(&mut self, tenant: TenantId, id: AdvanceId) -> Result<(), StoreError> {
        if self
            .work
            .advances
            .get(&id)
            .is_some_and(|a| a.tenant_id == tenant)
        {
            self.work.advances.remove(&id);
        }
        Ok(())
    }

    async fn credit(
        &mut self,
        tenant: TenantId,
        id: CreditId,
    ) -> Result<Option<Credit>, StoreError> {
        Ok(scoped(self.work.credits.get(&id), |c| c.tenant_id, tenant))
    }

    async fn insert_credit(&mut self, credit: &Credit) -> Result<(), StoreError> {
        self.work.credits.insert(credit.id, credit.clone());
        Ok(())
    }

    async fn update_credit(&mut self, credit: &Credit) -> Result<(), StoreError> {
        self.work.credits.insert(credit.id, credit.clone());
        Ok(())
    }

    async fn delete_credit(&mut self, tenant: TenantId, id: CreditId) -> Result<(), StoreError> {
        if self
            .work
            .credits
            .get(&id)
            .is_some_and(|c| c.tenant_id == tenant)
        {
            self.work.credits.remove(&id);
        }
        Ok(())
    }

    async fn utilization(
        &mut self,
        tenant: TenantId,
        id: UtilizationId,
    ) -> Result<Option<Utilization>, StoreError> {
        Ok(scoped(
            self.work.utilizations.get(&id),
            |u| u.tenant_id,
            tenant,
        ))
    }

    async fn insert_utilization(&mut self, utilization: &Utilization) -> Result<(), StoreError> {
        self.work
            .utilizations
            .insert(utilization.id, utilization.clone());
        Ok(())
    }

    async fn delete_utilization(
        &mut self,
        tenant: TenantId,
        id: UtilizationId,
    ) -> Result<(), StoreError> {
        if self
            .work
            .utilizations
            .get(&id)
            .is_some_and(|u| u.tenant_id == tenant)
        {
            self.work.utilizations.remove(&id);
        }
        Ok(())
    }

    async fn utilizations_for_payable(
        &mut self,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<Vec<Utilization>, StoreError> {
        let mut rows: Vec<Utilization> = self
            .work
            .utilizations
            .values()
            .filter(|u| u.tenant_id == tenant && u.payable_id == payable_id)
            .cloned()
            .collect();
        rows.sort_by_key(|u| u.created_at);
        Ok(rows)
    }

    async fn utilizations_for_source(
        &mut self,
        tenant: TenantId,
        source: FundingSource,
    ) -> Result<Vec<Utilization>, StoreError> {
        let mut rows: Vec<Utilization> = self
            .work
            .utilizations
            .values()
            .filter(|u| u.tenant_id == tenant && u.source == source)
            .cloned()
            .collect();
        rows.sort_by_key(|u| u.created_at);
        Ok(rows)
    }

    async fn commit(mut self: Box<Self>) -> Result<(), StoreError> {
        *self.guard = self.work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::{CounterpartyId, Currency, Money};
    use rust_decimal_macros::dec;

    fn test_payable(tenant: TenantId) -> Payable {
        Payable::new(
            tenant,
            CounterpartyId::new(),
            Money::new(dec!(100), Currency::BRL),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_commit_makes_writes_visible() {
        let store = MemoryLedgerStore::new();
        let tenant = TenantId::new();
        let payable = test_payable(tenant);
        let id = payable.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_payable(&payable).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.payable(tenant, id).await.unwrap().is_some());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = MemoryLedgerStore::new();
        let tenant = TenantId::new();
        let payable = test_payable(tenant);
        let id = payable.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_payable(&payable).await.unwrap();
        tx.rollback().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.payable(tenant, id).await.unwrap().is_none());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_rows_are_tenant_scoped() {
        let store = MemoryLedgerStore::new();
        let owner = TenantId::new();
        let intruder = TenantId::new();
        let payable = test_payable(owner);
        let id = payable.id;

        let mut tx = store.begin().await.unwrap();
        tx.insert_payable(&payable).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.payable(intruder, id).await.unwrap().is_none());
        tx.delete_payable(intruder, id).await.unwrap();
        assert!(tx.payable(owner, id).await.unwrap().is_some());
        tx.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_installments_sorted_by_sequence() {
        let store = MemoryLedgerStore::new();
        let tenant = TenantId::new();
        let parent = ObligationRef::Payable(PayableId::new());

        let mut tx = store.begin().await.unwrap();
        for seq in [3u32, 1, 2] {
            let inst = Installment::new(
                tenant,
                parent,
                seq,
                Money::new(dec!(10), Currency::BRL),
                NaiveDate::from_ymd_opt(2024, 1, seq).unwrap(),
            );
            tx.insert_installment(&inst).await.unwrap();
        }
        let rows = tx.installments_for(tenant, parent).await.unwrap();
        tx.rollback().await.unwrap();

        let sequences: Vec<u32> = rows.iter().map(|i| i.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }
}
