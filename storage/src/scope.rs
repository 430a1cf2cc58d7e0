//! Per-request resolution context.
//!
//! Tenant, connection, and model are resolved once at request entry and
//! carried here; collaborators receive the scope instead of re-deriving
//! any of it.

use std::sync::Arc;

use errors::{LudoError, RequestError};
use ludo_core::types::{ClaimSet, TenantId};

use crate::connection::{MongoConnector, PooledConnection};
use crate::crud::CrudEngine;
use crate::model::BoundModel;
use crate::provider::ConnectionProvider;
use crate::route::RouteModelProvider;
use crate::tenant::resolve_tenant;

/// Everything a request's handlers need from the tenant core.
#[derive(Debug)]
pub struct RequestScope {
    tenant_id: Option<TenantId>,
    teams: Vec<String>,
    connection: Arc<PooledConnection>,
    model: Option<Arc<BoundModel>>,
}

impl RequestScope {
    /// Resolves the full chain once: claims -> connection -> optional
    /// model for the route's collection segment.
    ///
    /// System-scoped entities (companies, global users, setting templates)
    /// bind on the fixed system connection and skip tenant resolution;
    /// everything else resolves the tenant database from the claims.
    pub async fn resolve(
        provider: &ConnectionProvider<MongoConnector>,
        models: &RouteModelProvider,
        claims: &ClaimSet,
        segment: Option<&str>,
    ) -> Result<Self, LudoError> {
        let descriptor = models.catalog().lookup_optional(segment)?;
        let (tenant_id, connection) = match descriptor {
            Some(descriptor) => provider.for_entity(descriptor, claims).await?,
            None => {
                let tenant = resolve_tenant(claims)?;
                let connection = provider.for_tenant(&tenant).await?;
                (Some(tenant), connection)
            }
        };
        let model = match descriptor {
            Some(descriptor) => Some(models.materialize(&connection, descriptor).await?),
            None => None,
        };
        Ok(Self {
            tenant_id,
            teams: claims.teams().to_vec(),
            connection,
            model,
        })
    }

    /// The resolved tenant; absent for system-scoped entity requests.
    pub fn tenant_id(&self) -> Option<&TenantId> {
        self.tenant_id.as_ref()
    }

    /// The caller's team scope; empty means global visibility.
    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    pub fn connection(&self) -> &Arc<PooledConnection> {
        &self.connection
    }

    pub fn model(&self) -> Option<&Arc<BoundModel>> {
        self.model.as_ref()
    }

    /// The model, for routes that require one.
    pub fn require_model(&self) -> Result<&Arc<BoundModel>, RequestError> {
        self.model.as_ref().ok_or(RequestError::EmptyCollectionName)
    }

    /// CRUD engine over the route's model, when the route has one.
    pub fn engine(&self) -> Option<CrudEngine> {
        self.model.as_ref().map(|m| CrudEngine::new(Arc::clone(m)))
    }
}
