//! Utilization handlers

use axum::extract::{Path, State};
use axum::Json;
use core_kernel::UtilizationId;
use domain_ledger::Payable;

use crate::error::ApiError;
use crate::tenant::Tenant;
use crate::AppState;

/// Reverses a single utilization, returning its amount to the source
pub async fn reverse(
    State(state): State<AppState>,
    Tenant(tenant): Tenant,
    Path(id): Path<UtilizationId>,
) -> Result<Json<Payable>, ApiError> {
    let payable = state.engine.reverse_utilization(tenant, id).await?;
    Ok(Json(payable))
}
