//! Tenant resolution: decoded claims -> target database name.

use errors::RequestError;
use ludo_core::types::{ClaimSet, TenantId};
use tracing::trace;

/// Derives the tenant database for a request from its decoded claims.
///
/// Access claims win; refresh claims are the fallback for flows where no
/// access credential is present (e.g. token renewal). A request with
/// neither fails with `system/invalid-database` — tenant-scoped routes
/// never silently fall back to the system database.
pub fn resolve_tenant(claims: &ClaimSet) -> Result<TenantId, RequestError> {
    let raw = claims
        .access
        .as_ref()
        .and_then(|a| a.database.as_deref())
        .or_else(|| claims.refresh.as_ref().and_then(|r| r.database.as_deref()))
        .ok_or(RequestError::MissingTenant)?;

    let tenant = TenantId::new(raw.to_string()).ok_or(RequestError::MissingTenant)?;
    trace!(tenant = %tenant, "resolved tenant database");
    Ok(tenant)
}
