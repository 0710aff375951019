//! Payable handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use core_kernel::PayableId;
use domain_ledger::engine::{CreditApplication, AdvanceApplication, PaymentRecorded, PayableDetail};
use domain_ledger::{Installment, ObligationRef};

use crate::dto::{
    ApplyAdvanceBody, ApplyCreditBody, CreatePayableBody, DeletePayableParams,
    InstallmentPlanBody, PaymentBody,
};
use crate::error::ApiError;
use crate::tenant::Tenant;
use crate::AppState;

/// Creates a payable, optionally advance-funded and scheduled
pub async fn create(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<CreatePayableBody>,
) -> Result<(StatusCode, Json<PayableDetail>), ApiError> {
    let detail = state.engine.create_payable(tenant, body.into()).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Reads a payable with its schedule and applied funding
pub async fn detail(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<PayableId>,
) -> Result<Json<PayableDetail>, ApiError> {
    let detail = state.engine.payable_detail(tenant, id).await?;
    Ok(Json(detail))
}

/// Deletes a payable; `?reverse=true` reverses its utilizations first
pub async fn delete(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<PayableId>,
    Query(params): Query<DeletePayableParams>,
) -> Result<StatusCode, ApiError> {
    if params.reverse {
        state.engine.reverse_and_delete_payable(tenant, id).await?;
    } else {
        state.engine.delete_payable(tenant, id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Registers a direct cash payment
pub async fn register_payment(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<PayableId>,
    Json(body): Json<PaymentBody>,
) -> Result<Json<PaymentRecorded>, ApiError> {
    let outcome = state
        .engine
        .register_payment(tenant, body.into_request(id))
        .await?;
    Ok(Json(outcome))
}

/// Applies part of a credit's balance
pub async fn apply_credit(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<PayableId>,
    Json(body): Json<ApplyCreditBody>,
) -> Result<Json<CreditApplication>, ApiError> {
    let outcome = state
        .engine
        .apply_credit(tenant, body.into_request(id))
        .await?;
    Ok(Json(outcome))
}

/// Applies part of an advance's balance
pub async fn apply_advance(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<PayableId>,
    Json(body): Json<ApplyAdvanceBody>,
) -> Result<Json<AdvanceApplication>, ApiError> {
    let outcome = state
        .engine
        .apply_advance(tenant, body.into_request(id))
        .await?;
    Ok(Json(outcome))
}

/// Generates an equal-split installment schedule
pub async fn generate_installments(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<PayableId>,
    Json(body): Json<InstallmentPlanBody>,
) -> Result<(StatusCode, Json<Vec<Installment>>), ApiError> {
    let installments = state
        .engine
        .generate_installments(tenant, ObligationRef::Payable(id), body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(installments)))
}
