//! Test utilities for database integration tests
//!
//! Provides a migrated in-memory SQLite database so service tests across
//! all mailroom crates run without any external infrastructure.

use crate::DbConnection;
use mailroom_migrations::Migrator;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use std::time::Duration;

/// Test database backed by in-memory SQLite
pub struct TestDatabase {
    pub db: Arc<DbConnection>,
}

impl TestDatabase {
    /// Create a fresh, migrated in-memory database.
    ///
    /// Each call returns an isolated database; the pool is pinned to a
    /// single connection because every SQLite `:memory:` connection is its
    /// own database.
    pub async fn with_migrations() -> anyhow::Result<Self> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(5))
            .sqlx_logging(false);

        let db = Database::connect(opt).await?;

        Migrator::up(&db, None).await?;

        Ok(TestDatabase { db: Arc::new(db) })
    }
}
