use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};

use crate::{
    AggregateId, AggregateSnapshot, EventStoreError, History, Record, Result, SaveAggregateInput,
    Version, VersionRange,
    store::{AggregateSaver, EventStore},
};

/// PostgreSQL-backed event store implementation.
///
/// Versions are unique per aggregate; saving a taken version fails with
/// `ConcurrencyConflict` and the whole batch is rolled back.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Creates a new PostgreSQL event store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and creates a store on a fresh pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `events` and `aggregates` tables if they are missing.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../../../migrations/001_create_events_table.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Reads the aggregate row written by the aggregate-saving path.
    pub async fn saved_aggregate(
        &self,
        aggregate_type: &str,
        aggregate_id: &AggregateId,
    ) -> Result<Option<AggregateSnapshot>> {
        let row: Option<PgRow> = sqlx::query(
            r#"
            SELECT aggregate_type, aggregate_id, version, updated_at, state
            FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_id = $2
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(AggregateSnapshot {
                aggregate_id: AggregateId::new(row.try_get::<String, _>("aggregate_id")?),
                aggregate_type: row.try_get("aggregate_type")?,
                version: Version::new(row.try_get("version")?),
                timestamp: row.try_get("updated_at")?,
                state: row.try_get("state")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_records(
        conn: &mut PgConnection,
        aggregate_id: &AggregateId,
        records: &[Record],
    ) -> Result<()> {
        for record in records {
            sqlx::query(
                r#"
                INSERT INTO events (aggregate_id, version, data, recorded_at)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(aggregate_id.as_str())
            .bind(record.version.as_i64())
            .bind(&record.data)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id: aggregate_id.clone(),
                        version: record.version,
                    };
                }
                EventStoreError::Database(e)
            })?;
        }
        Ok(())
    }

    async fn exists(&self, aggregate_id: &AggregateId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE aggregate_id = $1)")
                .bind(aggregate_id.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    fn row_to_record(row: PgRow) -> Result<Record> {
        Ok(Record {
            version: Version::new(row.try_get("version")?),
            data: row.try_get("data")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn save(&self, aggregate_id: &AggregateId, records: Vec<Record>) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        Self::insert_records(&mut *tx, aggregate_id, &records).await?;
        tx.commit().await?;

        tracing::trace!(%aggregate_id, count = records.len(), "records saved");
        Ok(())
    }

    async fn load(&self, aggregate_id: &AggregateId, range: VersionRange) -> Result<History> {
        let rows = sqlx::query(
            r#"
            SELECT version, data
            FROM events
            WHERE aggregate_id = $1
              AND version >= $2
              AND ($3::BIGINT IS NULL OR version <= $3)
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id.as_str())
        .bind(range.from.as_i64())
        .bind(range.to.map(|v| v.as_i64()))
        .fetch_all(&self.pool)
        .await?;

        // An empty full-range result means nothing was ever saved; a narrower
        // range needs a second look to tell "unknown" from "out of range".
        if rows.is_empty() && (range.is_full() || !self.exists(aggregate_id).await?) {
            return Err(EventStoreError::AggregateNotFound(aggregate_id.clone()));
        }

        rows.into_iter().map(Self::row_to_record).collect()
    }

    fn aggregate_saver(&self) -> Option<&dyn AggregateSaver> {
        Some(self)
    }
}

#[async_trait]
impl AggregateSaver for PostgresEventStore {
    async fn save_aggregate(&self, input: SaveAggregateInput) -> Result<()> {
        if input.records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        Self::insert_records(&mut *tx, &input.aggregate_id, &input.records).await?;

        sqlx::query(
            r#"
            INSERT INTO aggregates (aggregate_type, aggregate_id, version, state, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (aggregate_type, aggregate_id) DO UPDATE SET
                version = EXCLUDED.version,
                state = EXCLUDED.state,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&input.aggregate_type)
        .bind(input.aggregate_id.as_str())
        .bind(input.version.as_i64())
        .bind(&input.state)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
