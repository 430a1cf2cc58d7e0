//! Tenant database connections: descriptor building, the connector seam,
//! and the process-wide connection registry.
//!
//! The registry guarantees one live connection per distinct URI. The
//! check-then-create window on first access is closed by keying a
//! `tokio::sync::OnceCell` per URI: concurrent first-callers race to the
//! same cell, exactly one runs the connector, the rest await the result.
//! A failed construction leaves the cell empty, so the next resolution
//! retries cleanly instead of observing a poisoned entry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config::DatabaseConfig;
use dashmap::DashMap;
use errors::StorageError;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Connection parameters for one physical database, deterministically
/// computed from the database name plus process-wide defaults. Two
/// descriptors with the same URI name the same connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    uri: String,
    redacted_uri: String,
    database: String,
    max_pool_size: u32,
    connect_timeout: Duration,
    selection_timeout: Duration,
}

impl ConnectionDescriptor {
    pub fn for_database(database: &str, config: &DatabaseConfig) -> Self {
        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            _ => String::new(),
        };
        let tail = format!(
            "{}:{}/{}?authSource={}",
            config.host, config.port, database, config.auth_source
        );
        let uri = format!("mongodb://{credentials}{tail}");
        let redacted_uri = if credentials.is_empty() {
            uri.clone()
        } else {
            format!("mongodb://***:***@{tail}")
        };
        Self {
            uri,
            redacted_uri,
            database: database.to_string(),
            max_pool_size: config.max_pool_size,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            selection_timeout: Duration::from_secs(config.selection_timeout_secs),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// URI with credentials stripped, safe for logs.
    pub fn redacted(&self) -> &str {
        &self.redacted_uri
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

/// A live, shared connection to one physical database. Created at most
/// once per URI for the process lifetime; the driver pools sockets
/// underneath.
pub struct PooledConnection {
    descriptor: ConnectionDescriptor,
    client: Client,
    database: Database,
}

impl PooledConnection {
    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Identity key: the resolved URI. The model registry keys its
    /// per-connection sub-registry on this.
    pub fn key(&self) -> &str {
        self.descriptor.uri()
    }

    pub fn name(&self) -> &str {
        self.descriptor.database()
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("uri", &self.descriptor.redacted())
            .finish_non_exhaustive()
    }
}

/// Seam between the registry and the actual driver, so the registry's
/// caching discipline is testable without a live server.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    type Conn: Send + Sync + 'static;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Self::Conn, StorageError>;
}

/// Production connector: parses options, applies pool and timeout limits,
/// and pings before handing the connection out so an unreachable host or
/// bad credentials fail here rather than on first use.
#[derive(Debug, Default, Clone)]
pub struct MongoConnector;

#[async_trait]
impl Connect for MongoConnector {
    type Conn = PooledConnection;

    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<PooledConnection, StorageError> {
        let connection_failed = |reason: String| StorageError::ConnectionFailed {
            target: descriptor.redacted().to_string(),
            reason,
        };

        let mut options = ClientOptions::parse(descriptor.uri())
            .await
            .map_err(|e| connection_failed(e.to_string()))?;
        options.max_pool_size = Some(descriptor.max_pool_size);
        options.connect_timeout = Some(descriptor.connect_timeout);
        options.server_selection_timeout = Some(descriptor.selection_timeout);

        let client = Client::with_options(options).map_err(|e| connection_failed(e.to_string()))?;
        let database = client.database(descriptor.database());

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| connection_failed(e.to_string()))?;

        info!(uri = %descriptor.redacted(), "established database connection");
        Ok(PooledConnection {
            descriptor: descriptor.clone(),
            client,
            database,
        })
    }
}

/// Process-wide cache: URI -> live connection. One instance is shared by
/// every in-flight request; constructed explicitly at startup rather than
/// living as an ambient global.
pub struct ConnectionRegistry<C: Connect> {
    connector: C,
    connections: DashMap<String, Arc<OnceCell<Arc<C::Conn>>>>,
}

impl<C: Connect> ConnectionRegistry<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            connections: DashMap::new(),
        }
    }

    /// Returns the connection for `descriptor`'s URI, constructing it on
    /// first access. Concurrent first-accesses for the same URI yield the
    /// same instance; construction failure is not cached.
    pub async fn get_or_create(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Arc<C::Conn>, StorageError> {
        let cell = self
            .connections
            .entry(descriptor.uri().to_string())
            .or_default()
            .clone();

        if let Some(existing) = cell.get() {
            debug!(uri = %descriptor.redacted(), "connection cache hit");
            return Ok(Arc::clone(existing));
        }

        let conn = cell
            .get_or_try_init(|| async {
                let conn = self.connector.connect(descriptor).await?;
                metrics::counter!("ludo_connections_created_total").increment(1);
                Ok::<_, StorageError>(Arc::new(conn))
            })
            .await?;
        Ok(Arc::clone(conn))
    }

    /// Number of live (successfully constructed) connections.
    pub fn live_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }
}
