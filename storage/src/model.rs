//! Bound models and the per-connection model registry.
//!
//! A `BoundModel` marries a canonical collection name to one specific
//! connection. Binding has a real side effect — the entity's declared
//! field shape is installed on the live database as a $jsonSchema
//! validator, plus a `teams` index for team-scoped entities — so it must
//! happen at most once per (connection, collection) pair. The registry
//! enforces that with the same per-key `OnceCell` discipline as the
//! connection registry.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use errors::StorageError;
use ludo_core::catalog::EntityDescriptor;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::ErrorKind;
use mongodb::{Collection, IndexModel};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::connection::PooledConnection;

/// Two-level cache: connection identity -> canonical collection name ->
/// built model. Generic over the model type so the cache discipline is
/// testable without a live database.
pub struct ModelRegistry<M> {
    models: DashMap<String, Arc<DashMap<String, Arc<OnceCell<Arc<M>>>>>>,
}

impl<M: Send + Sync + 'static> ModelRegistry<M> {
    pub fn new() -> Self {
        Self {
            models: DashMap::new(),
        }
    }

    /// Returns the model for (connection, collection), running `build`
    /// exactly once per pair. Repeated calls return the identical handle;
    /// a failed build leaves the slot empty for retry.
    pub async fn get_or_build<F, Fut>(
        &self,
        connection_key: &str,
        collection: &str,
        build: F,
    ) -> Result<Arc<M>, StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<M, StorageError>>,
    {
        let per_connection = self
            .models
            .entry(connection_key.to_string())
            .or_default()
            .clone();
        let cell = per_connection
            .entry(collection.to_string())
            .or_default()
            .clone();

        let model = cell
            .get_or_try_init(|| async {
                debug!(collection, "registering model on connection");
                let model = build().await?;
                metrics::counter!("ludo_models_bound_total").increment(1);
                Ok::<_, StorageError>(Arc::new(model))
            })
            .await?;
        Ok(Arc::clone(model))
    }

    /// Number of models built for one connection.
    pub fn bound_count(&self, connection_key: &str) -> usize {
        self.models
            .get(connection_key)
            .map_or(0, |per_connection| {
                per_connection
                    .iter()
                    .filter(|entry| entry.value().get().is_some())
                    .count()
            })
    }
}

impl<M: Send + Sync + 'static> Default for ModelRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Schema-backed data access handle scoped to one connection.
pub struct BoundModel {
    descriptor: &'static EntityDescriptor,
    collection: Collection<Document>,
}

impl BoundModel {
    /// Binds the entity onto the connection's database: creates the
    /// collection with its declared validator (first use only; an
    /// existing namespace means it is already bound) and ensures the
    /// membership index for team-scoped entities.
    pub async fn bind(
        conn: &PooledConnection,
        descriptor: &'static EntityDescriptor,
    ) -> Result<Self, StorageError> {
        let bind_failed = |reason: String| StorageError::BindFailed {
            collection: descriptor.collection.to_string(),
            reason,
        };

        let database = conn.database();
        match database
            .create_collection(descriptor.collection)
            .validator(validator_for(descriptor))
            .await
        {
            Ok(()) => {
                debug!(
                    collection = descriptor.collection,
                    database = conn.name(),
                    "collection created with schema validator"
                );
            }
            Err(e) if namespace_exists(&e) => {}
            Err(e) => return Err(bind_failed(e.to_string())),
        }

        let collection = database.collection::<Document>(descriptor.collection);
        if descriptor.team_scoped {
            collection
                .create_index(IndexModel::builder().keys(doc! { "teams": 1 }).build())
                .await
                .map_err(|e| bind_failed(e.to_string()))?;
        }

        Ok(Self {
            descriptor,
            collection,
        })
    }

    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// Canonical collection name.
    pub fn name(&self) -> &'static str {
        self.descriptor.collection
    }
}

impl std::fmt::Debug for BoundModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundModel")
            .field("collection", &self.descriptor.collection)
            .finish_non_exhaustive()
    }
}

/// $jsonSchema document derived from the entity's field specs.
pub(crate) fn validator_for(descriptor: &EntityDescriptor) -> Document {
    let mut properties = Document::new();
    let mut required: Vec<Bson> = Vec::new();
    for field in descriptor.fields {
        properties.insert(field.name, doc! { "bsonType": field.kind.bson_type() });
        if field.required {
            required.push(Bson::String(field.name.to_string()));
        }
    }

    let mut schema = doc! {
        "bsonType": "object",
        "properties": properties,
    };
    // The server rejects an empty `required` array.
    if !required.is_empty() {
        schema.insert("required", required);
    }
    doc! { "$jsonSchema": schema }
}

fn namespace_exists(err: &mongodb::error::Error) -> bool {
    matches!(*err.kind, ErrorKind::Command(ref command) if command.code == 48)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ludo_core::catalog::EntityKind;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn repeated_resolution_returns_the_identical_handle() {
        let registry: ModelRegistry<&'static str> = ModelRegistry::new();
        let builds = AtomicUsize::new(0);

        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            async { Ok("model") }
        };
        let first = registry.get_or_build("conn-a", "Player", build).await.unwrap();

        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            async { Ok("model") }
        };
        let second = registry.get_or_build("conn-a", "Player", build).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn keying_is_two_levels_deep() {
        let registry: ModelRegistry<String> = ModelRegistry::new();

        let on_a = registry
            .get_or_build("conn-a", "Player", || async { Ok("a".to_string()) })
            .await
            .unwrap();
        let on_b = registry
            .get_or_build("conn-b", "Player", || async { Ok("b".to_string()) })
            .await
            .unwrap();
        let other = registry
            .get_or_build("conn-a", "Team", || async { Ok("c".to_string()) })
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&on_a, &on_b));
        assert!(!Arc::ptr_eq(&on_a, &other));
        assert_eq!(registry.bound_count("conn-a"), 2);
        assert_eq!(registry.bound_count("conn-b"), 1);
    }

    #[tokio::test]
    async fn concurrent_first_builds_run_once() {
        let registry: Arc<ModelRegistry<u32>> = Arc::new(ModelRegistry::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let build = |counter: Arc<AtomicUsize>| {
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(7)
            }
        };

        let (a, b) = tokio::join!(
            registry.get_or_build("conn-a", "Match", build(Arc::clone(&builds))),
            registry.get_or_build("conn-a", "Match", build(Arc::clone(&builds))),
        );
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_build_is_retried() {
        let registry: ModelRegistry<u32> = ModelRegistry::new();

        let err = registry
            .get_or_build("conn-a", "Player", || async {
                Err(StorageError::BindFailed {
                    collection: "Player".to_string(),
                    reason: "transient".to_string(),
                })
            })
            .await;
        assert!(err.is_err());
        assert_eq!(registry.bound_count("conn-a"), 0);

        let model = registry
            .get_or_build("conn-a", "Player", || async { Ok(9) })
            .await
            .unwrap();
        assert_eq!(*model, 9);
    }

    #[test]
    fn validator_reflects_declared_fields() {
        let descriptor = EntityKind::Player.descriptor();
        let validator = validator_for(descriptor);
        let schema = validator.get_document("$jsonSchema").unwrap();

        let required = schema.get_array("required").unwrap();
        assert!(required.contains(&Bson::String("firstName".to_string())));
        assert!(required.contains(&Bson::String("lastName".to_string())));

        let properties = schema.get_document("properties").unwrap();
        assert_eq!(
            properties
                .get_document("teams")
                .unwrap()
                .get_str("bsonType")
                .unwrap(),
            "array"
        );
    }

    #[test]
    fn validator_omits_empty_required_list() {
        use ludo_core::catalog::{EntityScope, FieldKind, FieldSpec};

        static OPTIONAL_ONLY: EntityDescriptor = EntityDescriptor {
            kind: EntityKind::Report,
            segment: "reports",
            collection: "Report",
            scope: EntityScope::Tenant,
            team_scoped: true,
            fields: &[FieldSpec {
                name: "payload",
                kind: FieldKind::Object,
                required: false,
            }],
        };

        let validator = validator_for(&OPTIONAL_ONLY);
        let schema = validator.get_document("$jsonSchema").unwrap();
        assert!(schema.get_array("required").is_err());
        assert!(schema.get_document("properties").is_ok());
    }
}
