//! Advance handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use core_kernel::AdvanceId;
use domain_ledger::engine::AdvanceDetail;
use domain_ledger::Advance;

use crate::dto::{CreateAdvanceBody, UpdateTotalBody};
use crate::error::ApiError;
use crate::tenant::Tenant;
use crate::AppState;

/// Creates an advance
pub async fn create(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Json(body): Json<CreateAdvanceBody>,
) -> Result<(StatusCode, Json<Advance>), ApiError> {
    let advance = state.engine.create_advance(tenant, body.into()).await?;
    Ok((StatusCode::CREATED, Json(advance)))
}

/// Reads an advance with its consumption history
pub async fn detail(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<AdvanceId>,
) -> Result<Json<AdvanceDetail>, ApiError> {
    let detail = state.engine.advance_detail(tenant, id).await?;
    Ok(Json(detail))
}

/// Updates an advance's total; shrinking below consumption is rejected
pub async fn update_total(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<AdvanceId>,
    Json(body): Json<UpdateTotalBody>,
) -> Result<Json<Advance>, ApiError> {
    let advance = state
        .engine
        .update_advance_total(tenant, id, body.total.into())
        .await?;
    Ok(Json(advance))
}

/// Deletes an untouched advance
pub async fn delete(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<AdvanceId>,
) -> Result<StatusCode, ApiError> {
    state.engine.delete_advance(tenant, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
