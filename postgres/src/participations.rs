//! The `event_participants` table.

use crate::database_error;
use chrono::{DateTime, Utc};
use eventhub_core::error::StoreError;
use eventhub_core::store::{ParticipationStore, StoreFuture};
use eventhub_core::types::{EventId, Participation, UserId};
use sqlx::PgPool;
use uuid::Uuid;

/// `PostgreSQL`-backed [`ParticipationStore`].
///
/// Shares its pool with [`crate::PostgresEventStore`]; the migrations live
/// there.
#[derive(Clone, Debug)]
pub struct PostgresParticipationStore {
    pool: PgPool,
}

impl PostgresParticipationStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ParticipationStore for PostgresParticipationStore {
    fn insert(&self, participation: Participation) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                INSERT INTO event_participants (event_id, attendee_id, joined_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (event_id, attendee_id) DO NOTHING
                ",
            )
            .bind(participation.event_id.as_uuid())
            .bind(participation.attendee_id.as_uuid())
            .bind(participation.joined_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                // The event vanished between the existence check and the insert.
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_foreign_key_violation() {
                        return StoreError::EventNotFound(participation.event_id);
                    }
                }
                database_error("Failed to insert participation", &e)
            })?;

            let inserted = result.rows_affected() == 1;
            if !inserted {
                metrics::counter!("eventhub_duplicate_rsvps_total").increment(1);
            }
            Ok(inserted)
        })
    }

    fn remove(&self, event_id: EventId, attendee_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query(
                "DELETE FROM event_participants WHERE event_id = $1 AND attendee_id = $2",
            )
            .bind(event_id.as_uuid())
            .bind(attendee_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| database_error("Failed to remove participation", &e))?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn exists(&self, event_id: EventId, attendee_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let (exists,): (bool,) = sqlx::query_as(
                r"
                SELECT EXISTS (
                    SELECT 1 FROM event_participants
                    WHERE event_id = $1 AND attendee_id = $2
                )
                ",
            )
            .bind(event_id.as_uuid())
            .bind(attendee_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| database_error("Failed to check participation", &e))?;
            Ok(exists)
        })
    }

    fn list_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Participation>> {
        Box::pin(async move {
            let rows: Vec<(Uuid, DateTime<Utc>)> = sqlx::query_as(
                r"
                SELECT attendee_id, joined_at FROM event_participants
                WHERE event_id = $1
                ORDER BY joined_at ASC, attendee_id ASC
                ",
            )
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| database_error("Failed to list participations", &e))?;

            Ok(rows
                .into_iter()
                .map(|(attendee_id, joined_at)| Participation {
                    event_id,
                    attendee_id: UserId::from_uuid(attendee_id),
                    joined_at,
                })
                .collect())
        })
    }

    fn events_for_attendee(&self, attendee_id: UserId) -> StoreFuture<'_, Vec<EventId>> {
        Box::pin(async move {
            let rows: Vec<(Uuid,)> =
                sqlx::query_as("SELECT event_id FROM event_participants WHERE attendee_id = $1")
                    .bind(attendee_id.as_uuid())
                    .fetch_all(&self.pool)
                    .await
                    .map_err(|e| database_error("Failed to list attended events", &e))?;
            Ok(rows.into_iter().map(|(id,)| EventId::from_uuid(id)).collect())
        })
    }
}
