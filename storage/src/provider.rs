//! Request-facing connection provider: claims in, pooled connection out.

use std::sync::Arc;

use config::DatabaseConfig;
use errors::{LudoError, StorageError};
use ludo_core::catalog::{EntityDescriptor, EntityScope};
use ludo_core::types::{ClaimSet, TenantId};
use tracing::info;

use crate::connection::{Connect, ConnectionDescriptor, ConnectionRegistry, MongoConnector};
use crate::tenant::resolve_tenant;

/// Bridges tenant resolution and the connection registry.
///
/// Also owns the distinguished system connection for entities that are
/// not tenant-partitioned (company directory, global users, setting
/// templates). That connection is established eagerly at startup and
/// bypasses tenant resolution entirely.
pub struct ConnectionProvider<C: Connect = MongoConnector> {
    config: DatabaseConfig,
    registry: ConnectionRegistry<C>,
    system: Arc<C::Conn>,
}

impl<C: Connect> ConnectionProvider<C> {
    /// Builds the provider and establishes the system connection. A
    /// failure here is fatal at startup, which is deliberate: a process
    /// that cannot reach its own system database should not serve.
    pub async fn connect(config: DatabaseConfig, connector: C) -> Result<Self, StorageError> {
        let registry = ConnectionRegistry::new(connector);
        let descriptor = ConnectionDescriptor::for_database(&config.system_database, &config);
        let system = registry.get_or_create(&descriptor).await?;
        info!(database = %config.system_database, "system connection established");
        Ok(Self {
            config,
            registry,
            system,
        })
    }

    /// The fixed cross-tenant connection.
    pub fn system(&self) -> Arc<C::Conn> {
        Arc::clone(&self.system)
    }

    /// Connection for an already-resolved tenant.
    pub async fn for_tenant(&self, tenant: &TenantId) -> Result<Arc<C::Conn>, StorageError> {
        let descriptor = ConnectionDescriptor::for_database(tenant.as_str(), &self.config);
        self.registry.get_or_create(&descriptor).await
    }

    /// Full per-request path: resolve the tenant from claims, then get or
    /// create its connection. Call once per request and pass the result
    /// on; collaborators should not re-derive it.
    pub async fn resolve(&self, claims: &ClaimSet) -> Result<Arc<C::Conn>, LudoError> {
        let tenant = resolve_tenant(claims)?;
        Ok(self.for_tenant(&tenant).await?)
    }

    /// Connection serving one entity: the fixed system connection for
    /// system-scoped entities (no tenant resolution happens at all), the
    /// claimed tenant's database otherwise.
    pub async fn for_entity(
        &self,
        descriptor: &EntityDescriptor,
        claims: &ClaimSet,
    ) -> Result<(Option<TenantId>, Arc<C::Conn>), LudoError> {
        match descriptor.scope {
            EntityScope::System => Ok((None, self.system())),
            EntityScope::Tenant => {
                let tenant = resolve_tenant(claims)?;
                let connection = self.for_tenant(&tenant).await?;
                Ok((Some(tenant), connection))
            }
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

impl ConnectionProvider<MongoConnector> {
    pub async fn from_config(config: DatabaseConfig) -> Result<Self, StorageError> {
        Self::connect(config, MongoConnector).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use errors::ErrorClass;
    use ludo_core::EntityKind;
    use ludo_core::types::{AccessClaims, UserId};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingConnector {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Connect for CountingConnector {
        type Conn = String;

        async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<String, StorageError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Ok(descriptor.database().to_string())
        }
    }

    async fn provider() -> ConnectionProvider<CountingConnector> {
        ConnectionProvider::connect(
            DatabaseConfig::default(),
            CountingConnector {
                attempts: AtomicUsize::new(0),
            },
        )
        .await
        .unwrap()
    }

    fn claims_for(database: &str) -> ClaimSet {
        ClaimSet::from_access(AccessClaims {
            user_id: UserId::new("u1".to_string()).unwrap(),
            database: Some(database.to_string()),
            teams: Vec::new(),
        })
    }

    #[tokio::test]
    async fn system_connection_is_created_at_startup_and_reused() {
        let provider = provider().await;
        assert_eq!(provider.registry().live_count(), 1);
        assert_eq!(*provider.system(), "ludo");
        assert!(Arc::ptr_eq(&provider.system(), &provider.system()));
    }

    #[tokio::test]
    async fn resolve_routes_to_the_claimed_tenant_database() {
        let provider = provider().await;
        let conn = provider.resolve(&claims_for("acme-fc")).await.unwrap();
        assert_eq!(*conn, "acme-fc");

        // Same tenant again: cached, no second construction.
        let again = provider.resolve(&claims_for("acme-fc")).await.unwrap();
        assert!(Arc::ptr_eq(&conn, &again));
        // One system connection plus one tenant connection.
        assert_eq!(provider.registry().live_count(), 2);
    }

    #[tokio::test]
    async fn missing_claims_fail_before_any_connection_work() {
        let provider = provider().await;
        let before = provider.registry().live_count();
        let err = provider.resolve(&ClaimSet::default()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::InvalidRequest);
        assert_eq!(provider.registry().live_count(), before);
    }

    #[tokio::test]
    async fn system_scoped_entities_use_the_system_connection() {
        let provider = provider().await;
        let descriptor = EntityKind::Company.descriptor();
        let (tenant, conn) = provider
            .for_entity(descriptor, &claims_for("acme-fc"))
            .await
            .unwrap();
        assert!(tenant.is_none());
        assert!(Arc::ptr_eq(&conn, &provider.system()));
        // The tenant claim is ignored: no tenant connection appears.
        assert_eq!(provider.registry().live_count(), 1);
    }

    #[tokio::test]
    async fn system_scoped_entities_need_no_tenant_claim() {
        let provider = provider().await;
        let descriptor = EntityKind::User.descriptor();
        let (tenant, conn) = provider
            .for_entity(descriptor, &ClaimSet::default())
            .await
            .unwrap();
        assert!(tenant.is_none());
        assert_eq!(*conn, "ludo");
    }

    #[tokio::test]
    async fn tenant_scoped_entities_route_to_the_claimed_database() {
        let provider = provider().await;
        let descriptor = EntityKind::Player.descriptor();
        let (tenant, conn) = provider
            .for_entity(descriptor, &claims_for("acme-fc"))
            .await
            .unwrap();
        assert_eq!(tenant.unwrap().as_str(), "acme-fc");
        assert_eq!(*conn, "acme-fc");
    }

    #[tokio::test]
    async fn distinct_tenants_get_distinct_connections() {
        let provider = provider().await;
        let a = provider.resolve(&claims_for("acme-fc")).await.unwrap();
        let b = provider.resolve(&claims_for("other-co")).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*a, "acme-fc");
        assert_eq!(*b, "other-co");
    }
}
