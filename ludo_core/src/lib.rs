//! # Ludo Core
//!
//! Shared types for the Ludo multi-tenant backend core.
//!
//! This crate provides:
//! - Validated identifier newtypes (`TenantId`, `UserId`)
//! - Decoded credential claim types consumed by tenant resolution
//! - The entity catalog: the closed set of known collections, their path
//!   aliases, canonical names, and field schemas

pub mod catalog;
pub mod types;

pub use catalog::{EntityCatalog, EntityDescriptor, EntityKind, EntityScope, FieldKind, FieldSpec};
pub use types::{AccessClaims, ClaimSet, RefreshClaims, TenantId, UserId};
