//! SQLite persistence for things.

mod classify;
pub mod predicate;
mod thing_repository;
mod util;

pub use classify::SqliteStoreError;
pub use thing_repository::SqliteThingRepository;
pub use util::{connect, create_sqlite_pool, run_migrations, SqliteTransaction};

/// Embedded SQL migrations for the things database.
pub const MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
