//! Receivable handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use core_kernel::ReceivableId;
use domain_ledger::engine::{ReceiptRecorded, ReceivableDetail};
use domain_ledger::{Installment, ObligationRef, Receivable};

use crate::dto::{CreateReceivableBody, InstallmentPlanBody, ReceiptBody};
use crate::error::ApiError;
use crate::tenant::Tenant;
use crate::AppState;

/// Creates a receivable
pub async fn create(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<CreateReceivableBody>,
) -> Result<(StatusCode, Json<Receivable>), ApiError> {
    let receivable = state.engine.create_receivable(tenant, body.into()).await?;
    Ok((StatusCode::CREATED, Json(receivable)))
}

/// Reads a receivable with its schedule
pub async fn detail(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<ReceivableId>,
) -> Result<Json<ReceivableDetail>, ApiError> {
    let detail = state.engine.receivable_detail(tenant, id).await?;
    Ok(Json(detail))
}

/// Deletes an untouched receivable
pub async fn delete(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<ReceivableId>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_receivable(tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Registers an incoming payment
pub async fn register_receipt(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<ReceivableId>,
    Json(body): Json<ReceiptBody>,
) -> Result<Json<ReceiptRecorded>, ApiError> {
    let outcome = state
        .engine
        .register_receipt(tenant, body.into_request(id))
        .await?;
    Ok(Json(outcome))
}

/// Generates an equal-split installment schedule
pub async fn generate_installments(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<ReceivableId>,
    Json(body): Json<InstallmentPlanBody>,
) -> Result<(StatusCode, Json<Vec<Installment>>), ApiError> {
    let installments = state
        .engine
        .generate_installments(tenant, ObligationRef::Receivable(id), body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(installments)))
}
