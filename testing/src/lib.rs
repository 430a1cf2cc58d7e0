//! Shared test fixtures: unique identifiers and a process-wide MongoDB
//! container. Suites skip cleanly when no container runtime is available.

mod fixtures;

pub use fixtures::{MongoFixture, mongo, unique_id, unique_tenant_id};
