//! Generic CRUD engine: one operation set over any bound model.

use std::sync::Arc;

use errors::StorageError;
use mongodb::Collection;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{Document, doc};
use mongodb::options::ReturnDocument;
use tracing::warn;

use crate::model::BoundModel;

/// Listing options. Applied in order: filter, sort, limit, skip.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filter: Option<Document>,
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    pub skip: Option<u64>,
}

/// Combines the declared filter with the caller's team scope.
///
/// Empty scope means global visibility: the filter passes through
/// untouched. A non-empty scope restricts to documents whose `teams`
/// array contains any of the caller's teams, on top of the filter.
pub fn scoped_filter(team_scope: &[String], filter: Document) -> Document {
    if team_scope.is_empty() {
        return filter;
    }
    let membership: Vec<Document> = team_scope.iter().map(|t| doc! { "teams": t }).collect();
    doc! { "$and": [filter, { "$or": membership }] }
}

fn id_filter(id: &str) -> Option<Document> {
    let oid = ObjectId::parse_str(id).ok()?;
    Some(doc! { "_id": oid })
}

/// Create/read/delete and filtered-paginated listing, implemented once
/// and parameterized by whatever model the route provider supplied.
pub struct CrudEngine {
    model: Arc<BoundModel>,
}

impl CrudEngine {
    pub fn new(model: Arc<BoundModel>) -> Self {
        Self { model }
    }

    fn collection(&self) -> &Collection<Document> {
        self.model.collection()
    }

    fn query_failed(&self, err: &mongodb::error::Error) -> StorageError {
        warn!(collection = self.model.name(), error = %err, "query failed");
        StorageError::QueryFailed {
            collection: self.model.name().to_string(),
            reason: err.to_string(),
        }
    }

    fn write_failed(&self, err: &mongodb::error::Error) -> StorageError {
        warn!(collection = self.model.name(), error = %err, "write failed");
        StorageError::WriteFailed {
            collection: self.model.name().to_string(),
            reason: err.to_string(),
        }
    }

    /// Persists `item`, generating an identifier when none was supplied,
    /// and returns the persisted document.
    pub async fn create(&self, mut item: Document) -> Result<Document, StorageError> {
        if !item.contains_key("_id") {
            item.insert("_id", ObjectId::new());
        }
        self.collection()
            .insert_one(&item)
            .await
            .map_err(|e| self.write_failed(&e))?;
        Ok(item)
    }

    /// Fetches by identifier. A missing or malformed id yields `None`,
    /// never an error.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Document>, StorageError> {
        let Some(filter) = id_filter(id) else {
            return Ok(None);
        };
        self.collection()
            .find_one(filter)
            .await
            .map_err(|e| self.query_failed(&e))
    }

    /// Removes by identifier. Deleting a missing or malformed id is a
    /// no-op, not an error.
    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let Some(filter) = id_filter(id) else {
            return Ok(());
        };
        self.collection()
            .delete_one(filter)
            .await
            .map_err(|e| self.write_failed(&e))?;
        Ok(())
    }

    /// Filtered, team-scoped, paginated listing.
    pub async fn get(
        &self,
        team_scope: &[String],
        options: QueryOptions,
    ) -> Result<Vec<Document>, StorageError> {
        let filter = scoped_filter(team_scope, options.filter.unwrap_or_default());

        let mut find = self.collection().find(filter);
        if let Some(sort) = options.sort {
            find = find.sort(sort);
        }
        if let Some(limit) = options.limit {
            find = find.limit(limit);
        }
        if let Some(skip) = options.skip {
            find = find.skip(skip);
        }

        let mut cursor = find.await.map_err(|e| self.query_failed(&e))?;
        let mut results = Vec::new();
        while cursor.advance().await.map_err(|e| self.query_failed(&e))? {
            results.push(
                cursor
                    .deserialize_current()
                    .map_err(|e| self.query_failed(&e))?,
            );
        }
        Ok(results)
    }

    /// Atomic conditional replace.
    ///
    /// When the replacement carries a `version`, the match is conditioned
    /// on that version and the stored document gets `version + 1` — a
    /// concurrent writer bumps it first and this call returns `None`
    /// instead of overwriting. Without a `version` field this is a plain
    /// replace-by-id.
    pub async fn replace(
        &self,
        id: &str,
        mut replacement: Document,
    ) -> Result<Option<Document>, StorageError> {
        let Some(mut filter) = id_filter(id) else {
            return Ok(None);
        };

        let version = replacement
            .get_i64("version")
            .or_else(|_| replacement.get_i32("version").map(i64::from));
        if let Ok(version) = version {
            filter.insert("version", version);
            replacement.insert("version", version + 1);
        }

        self.collection()
            .find_one_and_replace(filter, replacement)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| self.write_failed(&e))
    }

    pub fn model(&self) -> &Arc<BoundModel> {
        &self.model
    }
}
