//! Database connection management

use std::sync::Arc;
use std::time::Duration;

use mailroom_migrations::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

pub type DbConnection = DatabaseConnection;

/// Connect to the configured database and bring the schema up to date.
pub async fn establish_connection(database_url: &str) -> Result<Arc<DbConnection>, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(50)
        .min_connections(2)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;

    Migrator::up(&db, None).await?;
    info!("Database connected, schema up to date");

    Ok(Arc::new(db))
}
