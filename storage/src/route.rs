//! Route model provider: raw `:collection` path segment -> bound model.

use std::sync::Arc;

use errors::LudoError;
use ludo_core::catalog::{EntityCatalog, EntityDescriptor};
use tracing::trace;

use crate::connection::PooledConnection;
use crate::model::{BoundModel, ModelRegistry};

/// Turns the generic collection segment of a request path into a working
/// [`BoundModel`] on the request's resolved connection.
///
/// Lookup failures (empty or unknown segment) are raised before any data
/// access. First-time use of a collection on a connection triggers schema
/// binding; afterwards the cached handle is returned.
pub struct RouteModelProvider {
    catalog: EntityCatalog,
    registry: Arc<ModelRegistry<BoundModel>>,
}

impl RouteModelProvider {
    pub fn new(catalog: EntityCatalog) -> Self {
        Self::with_registry(catalog, Arc::new(ModelRegistry::new()))
    }

    pub fn with_registry(catalog: EntityCatalog, registry: Arc<ModelRegistry<BoundModel>>) -> Self {
        Self { catalog, registry }
    }

    /// Resolution for routes where the segment is optional: absent or
    /// empty yields no model, an unknown segment is still an error.
    pub async fn resolve(
        &self,
        conn: &Arc<PooledConnection>,
        segment: Option<&str>,
    ) -> Result<Option<Arc<BoundModel>>, LudoError> {
        match self.catalog.lookup_optional(segment)? {
            None => Ok(None),
            Some(descriptor) => self.materialize(conn, descriptor).await.map(Some),
        }
    }

    /// Resolution for routes that require a collection segment.
    pub async fn resolve_required(
        &self,
        conn: &Arc<PooledConnection>,
        segment: Option<&str>,
    ) -> Result<Arc<BoundModel>, LudoError> {
        let descriptor = self.catalog.lookup_required(segment)?;
        self.materialize(conn, descriptor).await
    }

    pub(crate) async fn materialize(
        &self,
        conn: &Arc<PooledConnection>,
        descriptor: &'static EntityDescriptor,
    ) -> Result<Arc<BoundModel>, LudoError> {
        trace!(
            collection = descriptor.collection,
            database = conn.name(),
            "resolving model"
        );
        let bind_conn = Arc::clone(conn);
        let model = self
            .registry
            .get_or_build(conn.key(), descriptor.collection, move || async move {
                BoundModel::bind(&bind_conn, descriptor).await
            })
            .await?;
        Ok(model)
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &Arc<ModelRegistry<BoundModel>> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use errors::{ErrorClass, ErrorCode};

    // Full resolution against a live database is covered by the
    // integration tests; here we pin the lookup semantics the provider
    // inherits from the catalog.

    #[test]
    fn unknown_segment_maps_to_invalid_collection() {
        let provider = RouteModelProvider::new(EntityCatalog::new());
        let err: LudoError = provider
            .catalog()
            .lookup("formations")
            .unwrap_err()
            .into();
        assert_eq!(err.class(), ErrorClass::InvalidRequest);
        assert_eq!(err.code(), Some(ErrorCode::InvalidCollection));
    }

    #[test]
    fn required_segment_missing_maps_to_invalid_collection_name() {
        let provider = RouteModelProvider::new(EntityCatalog::new());
        let err = provider.catalog().lookup_required(None).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCollectionName);
    }
}
