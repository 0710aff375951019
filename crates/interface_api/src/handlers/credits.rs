//! Credit handlers

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use core_kernel::CreditId;
use domain_ledger::engine::CreditDetail;
use domain_ledger::Credit;
use serde::Deserialize;

use crate::dto::{CreateCreditBody, UpdateTotalBody};
use crate::error::ApiError;
use crate::tenant::Tenant;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreditDetailParams {
    /// Date to evaluate the effective (expiry-aware) status at; today by
    /// default
    pub as_of: Option<NaiveDate>,
}

/// Creates a credit
pub async fn create(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<CreateCreditBody>,
) -> Result<(StatusCode, Json<Credit>), ApiError> {
    let credit = state.engine.create_credit(tenant, body.into()).await?;
    Ok((StatusCode::CREATED, Json(credit)))
}

/// Reads a credit with its consumption history and effective status
pub async fn detail(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<CreditId>,
    Query(params): Query<CreditDetailParams>,
) -> Result<Json<CreditDetail>, ApiError> {
    let as_of = params.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let detail = state.engine.credit_detail(tenant, id, as_of).await?;
    Ok(Json(detail))
}

/// Updates a credit's total; shrinking below consumption is rejected
pub async fn update_total(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<CreditId>,
    Json(body): Json<UpdateTotalBody>,
) -> Result<Json<Credit>, ApiError> {
    let credit = state
        .engine
        .update_credit_total(tenant, id, body.total.into())
        .await?;
    Ok(Json(credit))
}

/// Deletes an untouched credit
pub async fn delete(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<CreditId>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_credit(tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
