//! # Ludo Errors
//!
//! Error taxonomy shared across the Ludo tenant core.
//!
//! Two classes exist:
//! - [`RequestError`]: the caller supplied input that cannot be resolved
//!   (missing tenant claim, unknown collection segment). Raised before any
//!   data access, carries a stable machine-readable code.
//! - [`StorageError`]: the underlying store failed after a valid request
//!   was formed. Carries the origin collection or target URI as context.

use serde::Serialize;
use thiserror::Error;

/// Machine-readable codes surfaced to clients for request-class failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCode {
    #[serde(rename = "system/invalid-database")]
    InvalidDatabase,
    #[serde(rename = "system/invalid-collection-name")]
    InvalidCollectionName,
    #[serde(rename = "system/invalid-collection")]
    InvalidCollection,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDatabase => "system/invalid-database",
            Self::InvalidCollectionName => "system/invalid-collection-name",
            Self::InvalidCollection => "system/invalid-collection",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-input failures, resolved before any data access.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("No tenant database could be determined from the credential")]
    MissingTenant,

    #[error("Missing or empty collection name in request path")]
    EmptyCollectionName,

    #[error("Unknown collection: {segment}")]
    UnknownCollection { segment: String },
}

impl RequestError {
    /// Stable code the HTTP layer serializes into error payloads.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingTenant => ErrorCode::InvalidDatabase,
            Self::EmptyCollectionName => ErrorCode::InvalidCollectionName,
            Self::UnknownCollection { .. } => ErrorCode::InvalidCollection,
        }
    }
}

/// Storage-layer failures after a valid request was formed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection to {target} failed: {reason}")]
    ConnectionFailed { target: String, reason: String },

    #[error("Query on {collection} failed: {reason}")]
    QueryFailed { collection: String, reason: String },

    #[error("Write on {collection} failed: {reason}")]
    WriteFailed { collection: String, reason: String },

    #[error("Schema binding on {collection} failed: {reason}")]
    BindFailed { collection: String, reason: String },
}

impl StorageError {
    /// Collection the failure originated from, when one applies.
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { .. } => None,
            Self::QueryFailed { collection, .. }
            | Self::WriteFailed { collection, .. }
            | Self::BindFailed { collection, .. } => Some(collection),
        }
    }
}

/// Coarse class callers use to pick a transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    InvalidRequest,
    ServerError,
}

/// Top-level error for the tenant core.
#[derive(Debug, Error)]
pub enum LudoError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LudoError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Request(_) => ErrorClass::InvalidRequest,
            Self::Storage(_) => ErrorClass::ServerError,
        }
    }

    /// Machine code for request-class errors; storage errors have none.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Request(e) => Some(e.code()),
            Self::Storage(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_codes_are_stable() {
        assert_eq!(
            RequestError::MissingTenant.code().as_str(),
            "system/invalid-database"
        );
        assert_eq!(
            RequestError::EmptyCollectionName.code().as_str(),
            "system/invalid-collection-name"
        );
        assert_eq!(
            RequestError::UnknownCollection {
                segment: "nope".to_string()
            }
            .code()
            .as_str(),
            "system/invalid-collection"
        );
    }

    #[test]
    fn classes_split_by_origin() {
        let req: LudoError = RequestError::MissingTenant.into();
        assert_eq!(req.class(), ErrorClass::InvalidRequest);
        assert!(req.code().is_some());

        let storage: LudoError = StorageError::QueryFailed {
            collection: "Player".to_string(),
            reason: "boom".to_string(),
        }
        .into();
        assert_eq!(storage.class(), ErrorClass::ServerError);
        assert!(storage.code().is_none());
    }

    #[test]
    fn storage_errors_carry_collection_context() {
        let err = StorageError::QueryFailed {
            collection: "Match".to_string(),
            reason: "cursor died".to_string(),
        };
        assert_eq!(err.collection(), Some("Match"));
        assert!(err.to_string().contains("Match"));
    }
}
