//! PostgreSQL implementation of the ledger store contract
//!
//! Every transaction runs at SERIALIZABLE isolation so two concurrent
//! applications against the same funding source cannot both pass the balance
//! check; the loser surfaces as `StoreError::Conflict` (PostgreSQL 40001) and
//! the caller retries from a fresh read.
//!
//! Queries are runtime-bound. Enum-typed columns are stored as TEXT through
//! the domain types' `as_str`/`parse` pairs.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use core_kernel::{
    AdvanceId, CreditId, Currency, InstallmentId, Money, PayableId, ReceivableId, TenantId,
    UtilizationId,
};
use domain_ledger::installment::{Installment, ObligationRef};
use domain_ledger::{
    Advance, AdvanceStatus, Credit, CreditKind, CreditStatus, FundingSource, InstallmentStatus,
    LedgerStore, LedgerTx, Payable, PayableStatus, Receivable, ReceivableStatus, StoreError,
    Utilization,
};

use crate::error::store_err;

/// A [`LedgerStore`] backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

fn row_currency(row: &PgRow) -> Result<Currency, StoreError> {
    let code: String = row.try_get("currency").map_err(store_err)?;
    code.parse()
        .map_err(|_| StoreError::Backend(format!("unknown currency code: {code}")))
}

fn row_money(row: &PgRow, column: &str, currency: Currency) -> Result<Money, StoreError> {
    let amount: Decimal = row.try_get(column).map_err(store_err)?;
    Ok(Money::new(amount, currency))
}

fn bad_enum(column: &str, value: &str) -> StoreError {
    StoreError::Backend(format!("unrecognized {column} value: {value}"))
}

fn payable_from_row(row: &PgRow) -> Result<Payable, StoreError> {
    let currency = row_currency(row)?;
    let status: String = row.try_get("status").map_err(store_err)?;

    Ok(Payable {
        id: PayableId::from(row.try_get::<Uuid, _>("id").map_err(store_err)?),
        tenant_id: TenantId::from(row.try_get::<Uuid, _>("tenant_id").map_err(store_err)?),
        counterparty_id: row
            .try_get::<Uuid, _>("counterparty_id")
            .map_err(store_err)?
            .into(),
        document_number: row.try_get("document_number").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        total: row_money(row, "total", currency)?,
        paid: row_money(row, "paid", currency)?,
        credit_applied: row_money(row, "credit_applied", currency)?,
        issued_on: row.try_get("issued_on").map_err(store_err)?,
        due_on: row.try_get("due_on").map_err(store_err)?,
        status: PayableStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        advance_id: row
            .try_get::<Option<Uuid>, _>("advance_id")
            .map_err(store_err)?
            .map(AdvanceId::from),
        settled_on: row.try_get("settled_on").map_err(store_err)?,
        note: row.try_get("note").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn receivable_from_row(row: &PgRow) -> Result<Receivable, StoreError> {
    let currency = row_currency(row)?;
    let status: String = row.try_get("status").map_err(store_err)?;

    Ok(Receivable {
        id: ReceivableId::from(row.try_get::<Uuid, _>("id").map_err(store_err)?),
        tenant_id: TenantId::from(row.try_get::<Uuid, _>("tenant_id").map_err(store_err)?),
        counterparty_id: row
            .try_get::<Uuid, _>("counterparty_id")
            .map_err(store_err)?
            .into(),
        document_number: row.try_get("document_number").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        total: row_money(row, "total", currency)?,
        received: row_money(row, "received", currency)?,
        issued_on: row.try_get("issued_on").map_err(store_err)?,
        due_on: row.try_get("due_on").map_err(store_err)?,
        status: ReceivableStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        settled_on: row.try_get("settled_on").map_err(store_err)?,
        note: row.try_get("note").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn installment_from_row(row: &PgRow) -> Result<Installment, StoreError> {
    let currency = row_currency(row)?;
    let status: String = row.try_get("status").map_err(store_err)?;
    let parent_kind: String = row.try_get("parent_kind").map_err(store_err)?;
    let parent_id: Uuid = row.try_get("parent_id").map_err(store_err)?;
    let parent = match parent_kind.as_str() {
        "payable" => ObligationRef::Payable(PayableId::from(parent_id)),
        "receivable" => ObligationRef::Receivable(ReceivableId::from(parent_id)),
        other => return Err(bad_enum("parent_kind", other)),
    };

    Ok(Installment {
        id: InstallmentId::from(row.try_get::<Uuid, _>("id").map_err(store_err)?),
        tenant_id: TenantId::from(row.try_get::<Uuid, _>("tenant_id").map_err(store_err)?),
        parent,
        sequence: row.try_get::<i32, _>("sequence").map_err(store_err)? as u32,
        amount: row_money(row, "amount", currency)?,
        amount_settled: row_money(row, "amount_settled", currency)?,
        due_on: row.try_get("due_on").map_err(store_err)?,
        status: InstallmentStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        settled_on: row.try_get("settled_on").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn advance_from_row(row: &PgRow) -> Result<Advance, StoreError> {
    let currency = row_currency(row)?;
    let status: String = row.try_get("status").map_err(store_err)?;

    Ok(Advance {
        id: AdvanceId::from(row.try_get::<Uuid, _>("id").map_err(store_err)?),
        tenant_id: TenantId::from(row.try_get::<Uuid, _>("tenant_id").map_err(store_err)?),
        counterparty_id: row
            .try_get::<Uuid, _>("counterparty_id")
            .map_err(store_err)?
            .into(),
        total: row_money(row, "total", currency)?,
        utilized: row_money(row, "utilized", currency)?,
        advanced_on: row.try_get("advanced_on").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        status: AdvanceStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        note: row.try_get("note").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn credit_from_row(row: &PgRow) -> Result<Credit, StoreError> {
    let currency = row_currency(row)?;
    let status: String = row.try_get("status").map_err(store_err)?;
    let kind: String = row.try_get("kind").map_err(store_err)?;

    Ok(Credit {
        id: CreditId::from(row.try_get::<Uuid, _>("id").map_err(store_err)?),
        tenant_id: TenantId::from(row.try_get::<Uuid, _>("tenant_id").map_err(store_err)?),
        counterparty_id: row
            .try_get::<Uuid, _>("counterparty_id")
            .map_err(store_err)?
            .into(),
        kind: CreditKind::parse(&kind).ok_or_else(|| bad_enum("kind", &kind))?,
        total: row_money(row, "total", currency)?,
        utilized: row_money(row, "utilized", currency)?,
        credited_on: row.try_get("credited_on").map_err(store_err)?,
        expires_on: row.try_get("expires_on").map_err(store_err)?,
        origin_payable_id: row
            .try_get::<Option<Uuid>, _>("origin_payable_id")
            .map_err(store_err)?
            .map(PayableId::from),
        reason: row.try_get("reason").map_err(store_err)?,
        status: CreditStatus::parse(&status).ok_or_else(|| bad_enum("status", &status))?,
        note: row.try_get("note").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn utilization_from_row(row: &PgRow) -> Result<Utilization, StoreError> {
    let currency = row_currency(row)?;
    let source_kind: String = row.try_get("source_kind").map_err(store_err)?;
    let source_id: Uuid = row.try_get("source_id").map_err(store_err)?;
    let source = match source_kind.as_str() {
        "advance" => FundingSource::Advance(AdvanceId::from(source_id)),
        "credit" => FundingSource::Credit(CreditId::from(source_id)),
        other => return Err(bad_enum("source_kind", other)),
    };

    Ok(Utilization {
        id: UtilizationId::from(row.try_get::<Uuid, _>("id").map_err(store_err)?),
        tenant_id: TenantId::from(row.try_get::<Uuid, _>("tenant_id").map_err(store_err)?),
        source,
        payable_id: PayableId::from(row.try_get::<Uuid, _>("payable_id").map_err(store_err)?),
        amount: row_money(row, "amount", currency)?,
        applied_on: row.try_get("applied_on").map_err(store_err)?,
        note: row.try_get("note").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
    })
}

fn parent_parts(parent: ObligationRef) -> (&'static str, Uuid) {
    match parent {
        ObligationRef::Payable(id) => ("payable", *id.as_uuid()),
        ObligationRef::Receivable(id) => ("receivable", *id.as_uuid()),
    }
}

fn source_parts(source: FundingSource) -> (&'static str, Uuid) {
    match source {
        FundingSource::Advance(id) => ("advance", *id.as_uuid()),
        FundingSource::Credit(id) => ("credit", *id.as_uuid()),
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn payable(
        &mut self,
        tenant: TenantId,
        id: PayableId,
    ) -> Result<Option<Payable>, StoreError> {
        let row = sqlx::query("SELECT * FROM payables WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(payable_from_row).transpose()
    }

    async fn insert_payable(&mut self, payable: &Payable) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO payables \
             (id, tenant_id, counterparty_id, document_number, description, currency, \
              total, paid, credit_applied, issued_on, due_on, status, advance_id, \
              settled_on, note, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(*payable.id.as_uuid())
        .bind(*payable.tenant_id.as_uuid())
        .bind(*payable.counterparty_id.as_uuid())
        .bind(&payable.document_number)
        .bind(&payable.description)
        .bind(payable.currency().code())
        .bind(payable.total.amount())
        .bind(payable.paid.amount())
        .bind(payable.credit_applied.amount())
        .bind(payable.issued_on)
        .bind(payable.due_on)
        .bind(payable.status.as_str())
        .bind(payable.advance_id.map(|a| *a.as_uuid()))
        .bind(payable.settled_on)
        .bind(&payable.note)
        .bind(payable.created_at)
        .bind(payable.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_payable(&mut self, payable: &Payable) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE payables SET paid = $3, credit_applied = $4, status = $5, \
             advance_id = $6, settled_on = $7, note = $8, updated_at = $9 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*payable.id.as_uuid())
        .bind(*payable.tenant_id.as_uuid())
        .bind(payable.paid.amount())
        .bind(payable.credit_applied.amount())
        .bind(payable.status.as_str())
        .bind(payable.advance_id.map(|a| *a.as_uuid()))
        .bind(payable.settled_on)
        .bind(&payable.note)
        .bind(payable.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_payable(&mut self, tenant: TenantId, id: PayableId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM payables WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn receivable(
        &mut self,
        tenant: TenantId,
        id: ReceivableId,
    ) -> Result<Option<Receivable>, StoreError> {
        let row = sqlx::query("SELECT * FROM receivables WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(receivable_from_row).transpose()
    }

    async fn insert_receivable(&mut self, receivable: &Receivable) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO receivables \
             (id, tenant_id, counterparty_id, document_number, description, currency, \
              total, received, issued_on, due_on, status, settled_on, note, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(*receivable.id.as_uuid())
        .bind(*receivable.tenant_id.as_uuid())
        .bind(*receivable.counterparty_id.as_uuid())
        .bind(&receivable.document_number)
        .bind(&receivable.description)
        .bind(receivable.currency().code())
        .bind(receivable.total.amount())
        .bind(receivable.received.amount())
        .bind(receivable.issued_on)
        .bind(receivable.due_on)
        .bind(receivable.status.as_str())
        .bind(receivable.settled_on)
        .bind(&receivable.note)
        .bind(receivable.created_at)
        .bind(receivable.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_receivable(&mut self, receivable: &Receivable) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE receivables SET received = $3, status = $4, settled_on = $5, \
             note = $6, updated_at = $7 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*receivable.id.as_uuid())
        .bind(*receivable.tenant_id.as_uuid())
        .bind(receivable.received.amount())
        .bind(receivable.status.as_str())
        .bind(receivable.settled_on)
        .bind(&receivable.note)
        .bind(receivable.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_receivable(
        &mut self,
        tenant: TenantId,
        id: ReceivableId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM receivables WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn installment(
        &mut self,
        tenant: TenantId,
        id: InstallmentId,
    ) -> Result<Option<Installment>, StoreError> {
        let row = sqlx::query("SELECT * FROM installments WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(installment_from_row).transpose()
    }

    async fn insert_installment(&mut self, installment: &Installment) -> Result<(), StoreError> {
        let (parent_kind, parent_id) = parent_parts(installment.parent);
        sqlx::query(
            "INSERT INTO installments \
             (id, tenant_id, parent_kind, parent_id, sequence, currency, amount, \
              amount_settled, due_on, status, settled_on, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(*installment.id.as_uuid())
        .bind(*installment.tenant_id.as_uuid())
        .bind(parent_kind)
        .bind(parent_id)
        .bind(installment.sequence as i32)
        .bind(installment.amount.currency().code())
        .bind(installment.amount.amount())
        .bind(installment.amount_settled.amount())
        .bind(installment.due_on)
        .bind(installment.status.as_str())
        .bind(installment.settled_on)
        .bind(installment.created_at)
        .bind(installment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_installment(&mut self, installment: &Installment) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE installments SET amount_settled = $3, status = $4, settled_on = $5, \
             updated_at = $6 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*installment.id.as_uuid())
        .bind(*installment.tenant_id.as_uuid())
        .bind(installment.amount_settled.amount())
        .bind(installment.status.as_str())
        .bind(installment.settled_on)
        .bind(installment.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn installments_for(
        &mut self,
        tenant: TenantId,
        parent: ObligationRef,
    ) -> Result<Vec<Installment>, StoreError> {
        let (parent_kind, parent_id) = parent_parts(parent);
        let rows = sqlx::query(
            "SELECT * FROM installments \
             WHERE tenant_id = $1 AND parent_kind = $2 AND parent_id = $3 \
             ORDER BY sequence",
        )
        .bind(*tenant.as_uuid())
        .bind(parent_kind)
        .bind(parent_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;
        rows.iter().map(installment_from_row).collect()
    }

    async fn delete_installments_for(
        &mut self,
        tenant: TenantId,
        parent: ObligationRef,
    ) -> Result<(), StoreError> {
        let (parent_kind, parent_id) = parent_parts(parent);
        sqlx::query(
            "DELETE FROM installments \
             WHERE tenant_id = $1 AND parent_kind = $2 AND parent_id = $3",
        )
        .bind(*tenant.as_uuid())
        .bind(parent_kind)
        .bind(parent_id)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn advance(
        &mut self,
        tenant: TenantId,
        id: AdvanceId,
    ) -> Result<Option<Advance>, StoreError> {
        let row = sqlx::query("SELECT * FROM advances WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(advance_from_row).transpose()
    }

    async fn insert_advance(&mut self, advance: &Advance) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO advances \
             (id, tenant_id, counterparty_id, currency, total, utilized, advanced_on, \
              description, status, note, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(*advance.id.as_uuid())
        .bind(*advance.tenant_id.as_uuid())
        .bind(*advance.counterparty_id.as_uuid())
        .bind(advance.currency().code())
        .bind(advance.total.amount())
        .bind(advance.utilized.amount())
        .bind(advance.advanced_on)
        .bind(&advance.description)
        .bind(advance.status.as_str())
        .bind(&advance.note)
        .bind(advance.created_at)
        .bind(advance.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_advance(&mut self, advance: &Advance) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE advances SET total = $3, utilized = $4, status = $5, note = $6, \
             updated_at = $7 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*advance.id.as_uuid())
        .bind(*advance.tenant_id.as_uuid())
        .bind(advance.total.amount())
        .bind(advance.utilized.amount())
        .bind(advance.status.as_str())
        .bind(&advance.note)
        .bind(advance.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_advance(&mut self, tenant: TenantId, id: AdvanceId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM advances WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn credit(
        &mut self,
        tenant: TenantId,
        id: CreditId,
    ) -> Result<Option<Credit>, StoreError> {
        let row = sqlx::query("SELECT * FROM credits WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(credit_from_row).transpose()
    }

    async fn insert_credit(&mut self, credit: &Credit) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO credits \
             (id, tenant_id, counterparty_id, kind, currency, total, utilized, credited_on, \
              expires_on, origin_payable_id, reason, status, note, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(*credit.id.as_uuid())
        .bind(*credit.tenant_id.as_uuid())
        .bind(*credit.counterparty_id.as_uuid())
        .bind(credit.kind.as_str())
        .bind(credit.currency().code())
        .bind(credit.total.amount())
        .bind(credit.utilized.amount())
        .bind(credit.credited_on)
        .bind(credit.expires_on)
        .bind(credit.origin_payable_id.map(|p| *p.as_uuid()))
        .bind(&credit.reason)
        .bind(credit.status.as_str())
        .bind(&credit.note)
        .bind(credit.created_at)
        .bind(credit.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn update_credit(&mut self, credit: &Credit) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE credits SET total = $3, utilized = $4, status = $5, expires_on = $6, \
             reason = $7, note = $8, updated_at = $9 \
             WHERE id = $1 AND tenant_id = $2",
        )
        .bind(*credit.id.as_uuid())
        .bind(*credit.tenant_id.as_uuid())
        .bind(credit.total.amount())
        .bind(credit.utilized.amount())
        .bind(credit.status.as_str())
        .bind(credit.expires_on)
        .bind(&credit.reason)
        .bind(&credit.note)
        .bind(credit.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_credit(&mut self, tenant: TenantId, id: CreditId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM credits WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn utilization(
        &mut self,
        tenant: TenantId,
        id: UtilizationId,
    ) -> Result<Option<Utilization>, StoreError> {
        let row = sqlx::query("SELECT * FROM utilizations WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(utilization_from_row).transpose()
    }

    async fn insert_utilization(&mut self, utilization: &Utilization) -> Result<(), StoreError> {
        let (source_kind, source_id) = source_parts(utilization.source);
        sqlx::query(
            "INSERT INTO utilizations \
             (id, tenant_id, source_kind, source_id, payable_id, currency, amount, \
              applied_on, note, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(*utilization.id.as_uuid())
        .bind(*utilization.tenant_id.as_uuid())
        .bind(source_kind)
        .bind(source_id)
        .bind(*utilization.payable_id.as_uuid())
        .bind(utilization.amount.currency().code())
        .bind(utilization.amount.amount())
        .bind(utilization.applied_on)
        .bind(&utilization.note)
        .bind(utilization.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn delete_utilization(
        &mut self,
        tenant: TenantId,
        id: UtilizationId,
    ) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM utilizations WHERE id = $1 AND tenant_id = $2")
            .bind(*id.as_uuid())
            .bind(*tenant.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn utilizations_for_payable(
        &mut self,
        tenant: TenantId,
        payable_id: PayableId,
    ) -> Result<Vec<Utilization>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM utilizations WHERE tenant_id = $1 AND payable_id = $2 \
             ORDER BY created_at",
        )
        .bind(*tenant.as_uuid())
        .bind(*payable_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;
        rows.iter().map(utilization_from_row).collect()
    }

    async fn utilizations_for_source(
        &mut self,
        tenant: TenantId,
        source: FundingSource,
    ) -> Result<Vec<Utilization>, StoreError> {
        let (source_kind, source_id) = source_parts(source);
        let rows = sqlx::query(
            "SELECT * FROM utilizations \
             WHERE tenant_id = $1 AND source_kind = $2 AND source_id = $3 \
             ORDER BY created_at",
        )
        .bind(*tenant.as_uuid())
        .bind(source_kind)
        .bind(source_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;
        rows.iter().map(utilization_from_row).collect()
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(store_err)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(store_err)
    }
}
