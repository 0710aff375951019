//! Tenant extraction
//!
//! The tenant id arrives explicitly on every request in the `X-Tenant-Id`
//! header; it is never inferred from ambient state. A missing or unparsable
//! header is a 400 before any handler runs.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use core_kernel::TenantId;

use crate::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// The requesting tenant, extracted from the `X-Tenant-Id` header
#[derive(Debug, Clone, Copy)]
pub struct Tenant(pub TenantId);

#[async_trait]
impl<S> FromRequestParts<S> for Tenant
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_HEADER)
            .ok_or_else(|| ApiError::BadRequest("missing X-Tenant-Id header".to_string()))?;
        let raw = value
            .to_str()
            .map_err(|_| ApiError::BadRequest("invalid X-Tenant-Id header".to_string()))?;
        let tenant = raw
            .parse::<TenantId>()
            .map_err(|_| ApiError::BadRequest(format!("invalid tenant id: {raw}")))?;
        Ok(Tenant(tenant))
    }
}
