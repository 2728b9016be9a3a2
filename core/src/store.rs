//! Store traits for events and participations.
//!
//! Two durable collections back the service:
//!
//! - [`EventStore`]: event records, including the denormalized
//!   `attendees_count` aggregate.
//! - [`ParticipationStore`]: (event, attendee) pairs with uniqueness on the
//!   pair.
//!
//! # Consistency contract
//!
//! - [`ParticipationStore::insert`] must reject a duplicate pair atomically
//!   (report `false`), never merge it. Under concurrent registration exactly
//!   one caller observes `true`.
//! - [`EventStore::adjust_attendees`] must be a relative adjustment executed
//!   by the store (`count = count + delta`), never read-modify-write in the
//!   caller. The result is clamped at zero.
//! - [`EventStore::recount_attendees`] must count the live participation rows
//!   and store the result in one step, so that a registration landing
//!   concurrently is either counted or applies its own increment afterwards.
//!
//! # Implementations
//!
//! - `PostgresEventStore` / `PostgresParticipationStore` (in `eventhub-postgres`): production
//! - `InMemoryEventStore` / `InMemoryParticipationStore` (in `eventhub-testing`): tests
//!
//! # Dyn Compatibility
//!
//! Both traits return explicit `Pin<Box<dyn Future>>` so they can be held as
//! `Arc<dyn EventStore>` inside the services.

use crate::error::StoreError;
use crate::types::{Event, EventChanges, EventId, Participation, SearchFilter, UserId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Durable storage for event records.
pub trait EventStore: Send + Sync {
    /// Persist a new event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DatabaseError`] if the insert fails.
    fn insert(&self, event: Event) -> StoreFuture<'_, ()>;

    /// Load an event by id. `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails or the row cannot be decoded.
    fn get(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>>;

    /// Apply a partial update.
    ///
    /// Returns the updated record, or `None` when no row was changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn update(
        &self,
        event_id: EventId,
        changes: EventChanges,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<Event>>;

    /// Delete an event and, by cascade, its participations.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn delete(&self, event_id: EventId) -> StoreFuture<'_, bool>;

    /// Events matching `filter`, ordered by `date_time` ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn search(&self, filter: SearchFilter) -> StoreFuture<'_, Vec<Event>>;

    /// Events hosted by `host_id`, ordered by `date_time` descending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn hosted_by(&self, host_id: UserId) -> StoreFuture<'_, Vec<Event>>;

    /// Events with the given ids, ordered by `date_time` ascending.
    /// Unknown ids are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn get_many(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, Vec<Event>>;

    /// Atomically add `delta` to `attendees_count`, clamping at zero.
    ///
    /// Returns the new count, or `None` if the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn adjust_attendees(&self, event_id: EventId, delta: i64) -> StoreFuture<'_, Option<i64>>;

    /// Recompute `attendees_count` from the live participation rows in a
    /// single store-side operation (reconciliation).
    ///
    /// Returns the corrected count, or `None` if the event does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the update fails.
    fn recount_attendees(&self, event_id: EventId) -> StoreFuture<'_, Option<i64>>;

    /// Cheap connectivity check used by the readiness probe.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unreachable.
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// Durable storage for participation records.
pub trait ParticipationStore: Send + Sync {
    /// Insert a participation unless the pair already exists.
    ///
    /// Returns `true` if the row was created, `false` on duplicate.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EventNotFound`] if the event does not exist (for
    ///   example, deleted after the caller checked for it)
    /// - [`StoreError::DatabaseError`] if the insert fails for any other reason
    fn insert(&self, participation: Participation) -> StoreFuture<'_, bool>;

    /// Remove the participation for the pair.
    ///
    /// Returns `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the delete fails.
    fn remove(&self, event_id: EventId, attendee_id: UserId) -> StoreFuture<'_, bool>;

    /// Whether the pair is registered.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn exists(&self, event_id: EventId, attendee_id: UserId) -> StoreFuture<'_, bool>;

    /// Participations of one event, ordered by `joined_at` ascending.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn list_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Participation>>;

    /// Ids of events the user is registered for.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the query fails.
    fn events_for_attendee(&self, attendee_id: UserId) -> StoreFuture<'_, Vec<EventId>>;
}
