use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use things_core::DatabaseConfig;
use tracing::info;

use crate::MIGRATOR;

/// Creates a SQLite connection pool with default settings.
pub async fn create_sqlite_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    connect(&DatabaseConfig {
        url: database_url.to_owned(),
        ..DatabaseConfig::default()
    })
    .await
}

/// Creates a SQLite connection pool from configuration.
///
/// Foreign keys are enforced so removing a thing drops its connections.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool, sqlx::Error> {
    let options = config
        .url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.busy_timeout())
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    info!(
        max_connections = config.max_connections,
        "connected to things database"
    );
    Ok(pool)
}

/// Runs all outstanding migrations against the provided connection pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Transaction type used for batch writes.
pub type SqliteTransaction<'a> = sqlx::Transaction<'a, Sqlite>;
