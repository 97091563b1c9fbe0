//! SQLite implementation of the thing repository.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{query, Executor, QueryBuilder, Row, Sqlite, SqlitePool};
use things_core::{
    metadata, ChannelId, DatabaseConfig, ErrorKind, Metadata, Operation, Page, Thing,
    ThingId, ThingRepository, ThingsError, ThingsResult,
};
use tracing::{debug, warn};

use crate::classify::store_error;
use crate::predicate::{metadata_filter, name_filter, Predicate};
use crate::util::SqliteTransaction;

const THING_COLUMNS: &str = r#"th.id, th.owner, th.name, th."key", th.metadata"#;

/// SQLite-backed repository for things.
///
/// Stateless apart from the pool; safe to share across tasks. Uniqueness and
/// referential integrity are left to the schema.
pub struct SqliteThingRepository {
    pool: SqlitePool,
    operation_timeout: Option<Duration>,
}

impl SqliteThingRepository {
    /// Creates a new repository backed by the provided pool, without deadlines.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            operation_timeout: None,
        }
    }

    /// Creates a repository using the deadline from configuration.
    pub fn from_config(pool: SqlitePool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            operation_timeout: config.operation_timeout(),
        }
    }

    /// Bounds every operation by `timeout`.
    #[must_use]
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }

    /// Returns the underlying pool (useful for composing with other services).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts a single thing via the supplied executor.
    pub async fn insert_with_executor<'e, E>(executor: E, thing: &Thing) -> ThingsResult<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let metadata = metadata::encode(&thing.metadata)?;

        query(
            r#"
            INSERT INTO things (id, owner, name, "key", metadata)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(thing.id.to_canonical())
        .bind(&thing.owner)
        .bind(&thing.name)
        .bind(&thing.key)
        .bind(metadata)
        .execute(executor)
        .await
        .map(|_| ())
        .map_err(|err| store_error(Operation::Create, "insert thing", err))
    }

    async fn save_all(&self, things: &[Thing]) -> ThingsResult<Vec<Thing>> {
        if things.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx: SqliteTransaction<'_> = self
            .pool
            .begin()
            .await
            .map_err(|err| store_error(Operation::Create, "begin transaction", err))?;

        for thing in things {
            if let Err(err) = Self::insert_with_executor(&mut *tx, thing).await {
                warn!(
                    thing_id = %thing.id,
                    batch_size = things.len(),
                    error = %err,
                    "rolling back thing batch"
                );
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback of thing batch failed");
                }
                return Err(err);
            }
        }

        tx.commit()
            .await
            .map_err(|err| store_error(Operation::Create, "commit transaction", err))?;

        debug!(count = things.len(), "saved things");
        Ok(things.to_vec())
    }

    async fn update_thing(&self, thing: &Thing) -> ThingsResult<()> {
        let metadata = metadata::encode(&thing.metadata)?;

        let result = query(
            r#"
            UPDATE things
               SET name = ?1,
                   metadata = ?2
             WHERE owner = ?3 AND id = ?4
            "#,
        )
        .bind(&thing.name)
        .bind(metadata)
        .bind(&thing.owner)
        .bind(thing.id.to_canonical())
        .execute(&self.pool)
        .await
        .map_err(|err| store_error(Operation::Update, "update thing", err))?;

        if result.rows_affected() == 0 {
            return Err(ThingsError::not_found("thing", thing.id));
        }
        debug!(thing_id = %thing.id, "updated thing");
        Ok(())
    }

    async fn update_thing_key(&self, owner: &str, id: &str, key: &str) -> ThingsResult<()> {
        let thing_id = parse_thing_id(id)?;

        let result = query(
            r#"
            UPDATE things
               SET "key" = ?1
             WHERE owner = ?2 AND id = ?3
            "#,
        )
        .bind(key)
        .bind(owner)
        .bind(thing_id.to_canonical())
        .execute(&self.pool)
        .await
        .map_err(|err| store_error(Operation::Update, "update thing key", err))?;

        if result.rows_affected() == 0 {
            return Err(ThingsError::not_found("thing", thing_id));
        }
        debug!(thing_id = %thing_id, "rotated thing key");
        Ok(())
    }

    async fn fetch_by_id(&self, owner: &str, id: &str) -> ThingsResult<Thing> {
        let thing_id = parse_thing_id(id)?;

        let row = query(&format!(
            "SELECT {THING_COLUMNS} FROM things th WHERE th.id = ?1 AND th.owner = ?2"
        ))
        .bind(thing_id.to_canonical())
        .bind(owner)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| store_error(Operation::Select, "fetch thing", err))?;

        let thing = Self::map_row(&row)?;
        debug!(owner, thing_id = %thing.id, "fetched thing");
        Ok(thing)
    }

    async fn fetch_id_by_key(&self, key: &str) -> ThingsResult<ThingId> {
        if key.is_empty() {
            return Err(ThingsError::not_found("thing key", "<empty>"));
        }

        let id: String = query(r#"SELECT id FROM things WHERE "key" = ?1"#)
            .bind(key)
            .fetch_one(&self.pool)
            .await
            .and_then(|row| row.try_get("id"))
            .map_err(|err| store_error(Operation::Select, "fetch thing by key", err))?;

        let thing_id = ThingId::parse(&id)
            .ok_or_else(|| corrupt_row(format!("stored id `{id}` is not a UUID")))?;
        debug!(thing_id = %thing_id, "resolved thing by key");
        Ok(thing_id)
    }

    async fn list_filtered(
        &self,
        owner: &str,
        offset: u64,
        limit: u64,
        name: &str,
        metadata: &Metadata,
    ) -> ThingsResult<Page> {
        let metadata_predicate = metadata_filter(metadata).map_err(|err| {
            ThingsError::with_source(ErrorKind::SelectEntity, "metadata filter", err)
        })?;
        let predicate = name_filter(name).and(metadata_predicate);

        let mut builder = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {THING_COLUMNS} FROM things th WHERE th.owner = "
        ));
        push_scope(&mut builder, owner, &predicate);
        builder.push(" ORDER BY th.id LIMIT ");
        builder.push_bind(clamp(limit));
        builder.push(" OFFSET ");
        builder.push_bind(clamp(offset));

        let things = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|err| list_error("list things", err))?
            .iter()
            .map(Self::map_row)
            .collect::<ThingsResult<Vec<_>>>()?;

        let mut count =
            QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM things th WHERE th.owner = ");
        push_scope(&mut count, owner, &predicate);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|err| list_error("count things", err))?;

        debug!(owner, total, returned = things.len(), "listed things");
        Ok(Page::new(things, to_total(total), offset, limit))
    }

    async fn list_by_channel(
        &self,
        owner: &str,
        channel: &str,
        offset: u64,
        limit: u64,
        connected: bool,
    ) -> ThingsResult<Page> {
        let Some(channel_id) = ChannelId::parse(channel) else {
            return Err(ThingsError::not_found("channel", channel));
        };
        let channel_id = channel_id.to_canonical();

        let (select_sql, count_sql) = if connected {
            (
                format!(
                    r#"
                    SELECT {THING_COLUMNS}
                      FROM things th
                      JOIN connections conn ON conn.thing_id = th.id
                     WHERE th.owner = ?1 AND conn.channel_id = ?2
                  ORDER BY th.id
                     LIMIT ?3 OFFSET ?4
                    "#
                ),
                r#"
                SELECT COUNT(*)
                  FROM things th
                  JOIN connections conn ON conn.thing_id = th.id
                 WHERE th.owner = ?1 AND conn.channel_id = ?2
                "#,
            )
        } else {
            (
                format!(
                    r#"
                    SELECT {THING_COLUMNS}
                      FROM things th
                     WHERE th.owner = ?1
                       AND NOT EXISTS (
                           SELECT 1 FROM connections conn
                            WHERE conn.thing_id = th.id AND conn.channel_id = ?2
                       )
                  ORDER BY th.id
                     LIMIT ?3 OFFSET ?4
                    "#
                ),
                r#"
                SELECT COUNT(*)
                  FROM things th
                 WHERE th.owner = ?1
                   AND NOT EXISTS (
                       SELECT 1 FROM connections conn
                        WHERE conn.thing_id = th.id AND conn.channel_id = ?2
                   )
                "#,
            )
        };

        let things = query(&select_sql)
            .bind(owner)
            .bind(&channel_id)
            .bind(clamp(limit))
            .bind(clamp(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|err| list_error("list things by channel", err))?
            .iter()
            .map(Self::map_row)
            .collect::<ThingsResult<Vec<_>>>()?;

        let total: i64 = sqlx::query_scalar(count_sql)
            .bind(owner)
            .bind(&channel_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| list_error("count things by channel", err))?;

        debug!(
            owner,
            channel = %channel_id,
            connected,
            total,
            "listed things by channel"
        );
        Ok(Page::new(things, to_total(total), offset, limit))
    }

    async fn delete_thing(&self, owner: &str, id: &str) -> ThingsResult<()> {
        let Some(thing_id) = ThingId::parse(id) else {
            debug!(owner, id, "ignoring removal of malformed thing id");
            return Ok(());
        };

        let result = query("DELETE FROM things WHERE id = ?1 AND owner = ?2")
            .bind(thing_id.to_canonical())
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                ThingsError::with_source(ErrorKind::RemoveEntity, "delete thing", err)
            })?;

        debug!(thing_id = %thing_id, removed = result.rows_affected(), "removed thing");
        Ok(())
    }

    async fn bounded<T, F>(&self, operation: Operation, future: F) -> ThingsResult<T>
    where
        F: Future<Output = ThingsResult<T>> + Send,
    {
        let Some(limit) = self.operation_timeout else {
            return future.await;
        };
        match tokio::time::timeout(limit, future).await {
            Ok(result) => result,
            Err(elapsed) => {
                warn!(
                    ?operation,
                    timeout_ms = limit.as_millis() as u64,
                    "thing operation timed out"
                );
                Err(ThingsError::with_source(
                    operation.fallback_kind(),
                    "operation deadline exceeded",
                    elapsed,
                ))
            }
        }
    }

    fn map_row(row: &SqliteRow) -> ThingsResult<Thing> {
        let read = |column: &str| -> ThingsResult<String> {
            row.try_get(column)
                .map_err(|err| store_error(Operation::Select, "decode thing row", err))
        };

        let id = read("id")?;
        let id = ThingId::parse(&id)
            .ok_or_else(|| corrupt_row(format!("stored id `{id}` is not a UUID")))?;
        let metadata = metadata::decode(&read("metadata")?).map_err(|err| {
            ThingsError::with_source(ErrorKind::SelectEntity, "decode stored metadata", err)
        })?;

        Ok(Thing {
            id,
            owner: read("owner")?,
            name: read("name")?,
            key: read("key")?,
            metadata,
        })
    }
}

#[async_trait]
impl ThingRepository for SqliteThingRepository {
    async fn save(&self, things: &[Thing]) -> ThingsResult<Vec<Thing>> {
        self.bounded(Operation::Create, self.save_all(things)).await
    }

    async fn update(&self, thing: &Thing) -> ThingsResult<()> {
        self.bounded(Operation::Update, self.update_thing(thing)).await
    }

    async fn update_key(&self, owner: &str, id: &str, key: &str) -> ThingsResult<()> {
        self.bounded(Operation::Update, self.update_thing_key(owner, id, key))
            .await
    }

    async fn retrieve_by_id(&self, owner: &str, id: &str) -> ThingsResult<Thing> {
        self.bounded(Operation::Select, self.fetch_by_id(owner, id)).await
    }

    async fn retrieve_by_key(&self, key: &str) -> ThingsResult<ThingId> {
        self.bounded(Operation::Select, self.fetch_id_by_key(key)).await
    }

    async fn retrieve_all(
        &self,
        owner: &str,
        offset: u64,
        limit: u64,
        name: &str,
        metadata: &Metadata,
    ) -> ThingsResult<Page> {
        self.bounded(
            Operation::Select,
            self.list_filtered(owner, offset, limit, name, metadata),
        )
        .await
    }

    async fn retrieve_by_channel(
        &self,
        owner: &str,
        channel: &str,
        offset: u64,
        limit: u64,
        connected: bool,
    ) -> ThingsResult<Page> {
        self.bounded(
            Operation::Select,
            self.list_by_channel(owner, channel, offset, limit, connected),
        )
        .await
    }

    async fn remove(&self, owner: &str, id: &str) -> ThingsResult<()> {
        self.bounded(Operation::Remove, self.delete_thing(owner, id)).await
    }
}

fn parse_thing_id(id: &str) -> ThingsResult<ThingId> {
    ThingId::parse(id).ok_or_else(|| ThingsError::not_found("thing", id))
}

fn push_scope(builder: &mut QueryBuilder<'_, Sqlite>, owner: &str, predicate: &Predicate) {
    builder.push_bind(owner.to_owned());
    if !predicate.is_neutral() {
        builder.push(" AND ");
        predicate.push_to(builder);
    }
}

// Listings report every failure as a select error, whatever the store says.
fn list_error(context: &str, err: sqlx::Error) -> ThingsError {
    ThingsError::with_source(ErrorKind::SelectEntity, context.to_owned(), err)
}

fn corrupt_row(message: String) -> ThingsError {
    ThingsError::new(ErrorKind::SelectEntity, message)
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_total(count: i64) -> u64 {
    u64::try_from(count).unwrap_or_default()
}
