//! # Storage Layer
//!
//! The per-tenant connection and model resolution core.
//!
//! Given decoded request claims, this crate resolves which physical
//! database to talk to, establishes and caches that connection once per
//! URI, and turns a generic collection path segment into a typed,
//! schema-bound data access handle on that connection. The generic CRUD
//! engine then runs against whatever handle came out.

pub mod connection;
pub mod crud;
pub mod model;
pub mod provider;
pub mod route;
pub mod scope;
pub mod tenant;

pub use connection::{Connect, ConnectionDescriptor, ConnectionRegistry, MongoConnector, PooledConnection};
pub use crud::{CrudEngine, QueryOptions};
pub use model::{BoundModel, ModelRegistry};
pub use provider::ConnectionProvider;
pub use route::RouteModelProvider;
pub use scope::RequestScope;
pub use tenant::resolve_tenant;
