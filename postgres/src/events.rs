//! The `events` table.

use crate::{database_error, escape_like};
use chrono::{DateTime, Utc};
use eventhub_core::error::StoreError;
use eventhub_core::store::{EventStore, StoreFuture};
use eventhub_core::types::{Event, EventChanges, EventId, SearchFilter, UserId};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

const EVENT_COLUMNS: &str = "event_id, host_id, title, description, location, date_time, \
                             category, attendees_count, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    host_id: Uuid,
    title: String,
    description: Option<String>,
    location: String,
    date_time: DateTime<Utc>,
    category: Option<String>,
    attendees_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: EventId::from_uuid(row.event_id),
            host_id: UserId::from_uuid(row.host_id),
            title: row.title,
            description: row.description,
            location: row.location,
            date_time: row.date_time,
            category: row.category,
            attendees_count: row.attendees_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL`-backed [`EventStore`].
#[derive(Clone, Debug)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Connect to `database_url` with a default pool.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the connection fails.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(|e| database_error("Failed to connect", &e))?;
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for sharing with the participation store.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled migrations (`events`, `event_participants`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations applied");
        Ok(())
    }
}

impl EventStore for PostgresEventStore {
    fn insert(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO events (
                    event_id, host_id, title, description, location, date_time,
                    category, attendees_count, created_at, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(event.event_id.as_uuid())
            .bind(event.host_id.as_uuid())
            .bind(&event.title)
            .bind(&event.description)
            .bind(&event.location)
            .bind(event.date_time)
            .bind(&event.category)
            .bind(event.attendees_count)
            .bind(event.created_at)
            .bind(event.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("Failed to insert event", &e))?;

            tracing::debug!(event_id = %event.event_id, "Event row inserted");
            Ok(())
        })
    }

    fn get(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let row: Option<EventRow> =
                sqlx::query_as(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE event_id = $1"))
                    .bind(event_id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| database_error("Failed to load event", &e))?;
            Ok(row.map(Event::from))
        })
    }

    fn update(
        &self,
        event_id: EventId,
        changes: EventChanges,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            // `$3`/`$7` say whether the nullable columns were supplied at all,
            // so an explicit null clears them.
            let row: Option<EventRow> = sqlx::query_as(&format!(
                r"
                UPDATE events SET
                    title = COALESCE($2, title),
                    description = CASE WHEN $3 THEN $4 ELSE description END,
                    location = COALESCE($5, location),
                    date_time = COALESCE($6, date_time),
                    category = CASE WHEN $7 THEN $8 ELSE category END,
                    updated_at = $9
                WHERE event_id = $1
                RETURNING {EVENT_COLUMNS}
                "
            ))
            .bind(event_id.as_uuid())
            .bind(changes.title)
            .bind(changes.description.is_some())
            .bind(changes.description.flatten())
            .bind(changes.location)
            .bind(changes.date_time)
            .bind(changes.category.is_some())
            .bind(changes.category.flatten())
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("Failed to update event", &e))?;
            Ok(row.map(Event::from))
        })
    }

    fn delete(&self, event_id: EventId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("DELETE FROM events WHERE event_id = $1")
                .bind(event_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| database_error("Failed to delete event", &e))?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn search(&self, filter: SearchFilter) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let pattern = filter.query.as_deref().map(|q| format!("%{}%", escape_like(q)));
            let rows: Vec<EventRow> = sqlx::query_as(&format!(
                r"
                SELECT {EVENT_COLUMNS} FROM events
                WHERE date_time >= $1
                  AND ($2::text IS NULL OR title ILIKE $2 OR description ILIKE $2)
                  AND ($3::text IS NULL OR category = $3)
                ORDER BY date_time ASC, event_id ASC
                "
            ))
            .bind(filter.from)
            .bind(pattern)
            .bind(filter.category)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("Failed to search events", &e))?;

            tracing::debug!(results = rows.len(), "Event search completed");
            Ok(rows.into_iter().map(Event::from).collect())
        })
    }

    fn hosted_by(&self, host_id: UserId) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            let rows: Vec<EventRow> = sqlx::query_as(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE host_id = $1 \
                 ORDER BY date_time DESC, event_id DESC"
            ))
            .bind(host_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("Failed to load hosted events", &e))?;
            Ok(rows.into_iter().map(Event::from).collect())
        })
    }

    fn get_many(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            if event_ids.is_empty() {
                return Ok(Vec::new());
            }
            let ids: Vec<Uuid> = event_ids.iter().map(|id| *id.as_uuid()).collect();
            let rows: Vec<EventRow> = sqlx::query_as(&format!(
                "SELECT {EVENT_COLUMNS} FROM events WHERE event_id = ANY($1) \
                 ORDER BY date_time ASC, event_id ASC"
            ))
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("Failed to load events", &e))?;
            Ok(rows.into_iter().map(Event::from).collect())
        })
    }

    fn adjust_attendees(&self, event_id: EventId, delta: i64) -> StoreFuture<'_, Option<i64>> {
        Box::pin(async move {
            let count: Option<(i64,)> = sqlx::query_as(
                r"
                UPDATE events
                SET attendees_count = GREATEST(attendees_count + $2, 0)
                WHERE event_id = $1
                RETURNING attendees_count
                ",
            )
            .bind(event_id.as_uuid())
            .bind(delta)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("Failed to adjust attendee count", &e))?;
            Ok(count.map(|(c,)| c))
        })
    }

    fn recount_attendees(&self, event_id: EventId) -> StoreFuture<'_, Option<i64>> {
        Box::pin(async move {
            let count: Option<(i64,)> = sqlx::query_as(
                r"
                UPDATE events
                SET attendees_count = (
                    SELECT COUNT(*) FROM event_participants p
                    WHERE p.event_id = events.event_id
                )
                WHERE event_id = $1
                RETURNING attendees_count
                ",
            )
            .bind(event_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| database_error("Failed to recount attendees", &e))?;
            Ok(count.map(|(c,)| c))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| database_error("Database unreachable", &e))?;
            Ok(())
        })
    }
}
