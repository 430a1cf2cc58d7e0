use std::sync::atomic::{AtomicU32, Ordering};

use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::mongo::Mongo;
use tokio::sync::OnceCell;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

pub fn unique_tenant_id() -> String {
    unique_id("test-tenant")
}

pub struct MongoFixture {
    #[allow(dead_code)]
    container: ContainerAsync<Mongo>,
    host: String,
    port: u16,
}

impl MongoFixture {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn uri(&self) -> String {
        format!("mongodb://{}:{}", self.host, self.port)
    }
}

static MONGO: OnceCell<Option<MongoFixture>> = OnceCell::const_new();

/// Process-wide MongoDB container, started on first use. Returns `None`
/// when no container runtime is available so callers can skip.
pub async fn mongo() -> Option<&'static MongoFixture> {
    MONGO
        .get_or_init(|| async {
            match Mongo::default().start().await {
                Ok(container) => {
                    let port = container.get_host_port_ipv4(27017).await.ok()?;
                    tracing::info!("MongoDB fixture started on port {}", port);
                    Some(MongoFixture {
                        container,
                        host: "localhost".to_string(),
                        port,
                    })
                }
                Err(e) => {
                    tracing::warn!("Failed to start MongoDB container: {:?}", e);
                    None
                }
            }
        })
        .await
        .as_ref()
}
