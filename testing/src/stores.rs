//! In-memory store implementations.
//!
//! Fast, deterministic stand-ins for the PostgreSQL stores:
//! - [`InMemoryEventStore`]: `HashMap`-backed event records
//! - [`InMemoryParticipationStore`]: `HashMap`-backed participation pairs
//!
//! Both honour the consistency contract of the store traits: a duplicate pair
//! is rejected under the write lock, counter adjustments happen under the
//! write lock as a single relative update, and a recount holds the event and
//! participation locks together.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only happens after a test already panicked

use chrono::{DateTime, Utc};
use eventhub_core::error::StoreError;
use eventhub_core::store::{EventStore, ParticipationStore, StoreFuture};
use eventhub_core::types::{Event, EventChanges, EventId, Participation, SearchFilter, UserId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

fn injected_failure() -> StoreError {
    StoreError::DatabaseError("injected failure".to_string())
}

/// In-memory event store.
///
/// # Example
///
/// ```
/// use eventhub_testing::InMemoryEventStore;
///
/// let store = InMemoryEventStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<EventId, Event>>>,
    participations: Option<InMemoryParticipationStore>,
    failing: Arc<AtomicBool>,
    failing_adjustments: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose deletes cascade into `participations`, like the
    /// foreign key in PostgreSQL.
    #[must_use]
    pub fn cascading_to(participations: InMemoryParticipationStore) -> Self {
        Self {
            participations: Some(participations),
            ..Self::default()
        }
    }

    /// Make every operation fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Make only counter adjustments fail.
    pub fn set_failing_adjustments(&self, failing: bool) {
        self.failing_adjustments.store(failing, Ordering::SeqCst);
    }

    /// Number of stored events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().unwrap().is_empty()
    }

    /// Snapshot of one event, bypassing failure injection.
    #[must_use]
    pub fn snapshot(&self, event_id: EventId) -> Option<Event> {
        self.events.read().unwrap().get(&event_id).cloned()
    }

    /// Overwrite a stored event directly (for setting up divergent counters).
    pub fn put(&self, event: Event) {
        self.events.write().unwrap().insert(event.event_id, event);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(injected_failure())
        } else {
            Ok(())
        }
    }

    fn sorted_ascending(mut events: Vec<Event>) -> Vec<Event> {
        events.sort_by(|a, b| {
            a.date_time
                .cmp(&b.date_time)
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        events
    }
}

impl EventStore for InMemoryEventStore {
    fn insert(&self, event: Event) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.check()?;
            self.events.write().unwrap().insert(event.event_id, event);
            Ok(())
        })
    }

    fn get(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            self.check()?;
            Ok(self.events.read().unwrap().get(&event_id).cloned())
        })
    }

    fn update(
        &self,
        event_id: EventId,
        changes: EventChanges,
        now: DateTime<Utc>,
    ) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            self.check()?;
            let mut events = self.events.write().unwrap();
            Ok(events.get_mut(&event_id).map(|event| {
                event.apply(&changes, now);
                event.clone()
            }))
        })
    }

    fn delete(&self, event_id: EventId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.check()?;
            let removed = self.events.write().unwrap().remove(&event_id).is_some();
            if removed {
                if let Some(participations) = &self.participations {
                    participations.remove_event(event_id);
                }
            }
            Ok(removed)
        })
    }

    fn search(&self, filter: SearchFilter) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            self.check()?;
            let matching = self
                .events
                .read()
                .unwrap()
                .values()
                .filter(|event| filter.matches(event))
                .cloned()
                .collect();
            Ok(Self::sorted_ascending(matching))
        })
    }

    fn hosted_by(&self, host_id: UserId) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            self.check()?;
            let hosted = self
                .events
                .read()
                .unwrap()
                .values()
                .filter(|event| event.host_id == host_id)
                .cloned()
                .collect();
            let mut hosted = Self::sorted_ascending(hosted);
            hosted.reverse();
            Ok(hosted)
        })
    }

    fn get_many(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, Vec<Event>> {
        Box::pin(async move {
            self.check()?;
            let events = self.events.read().unwrap();
            let found = event_ids
                .iter()
                .filter_map(|id| events.get(id).cloned())
                .collect();
            Ok(Self::sorted_ascending(found))
        })
    }

    fn adjust_attendees(&self, event_id: EventId, delta: i64) -> StoreFuture<'_, Option<i64>> {
        Box::pin(async move {
            self.check()?;
            if self.failing_adjustments.load(Ordering::SeqCst) {
                return Err(injected_failure());
            }
            let mut events = self.events.write().unwrap();
            Ok(events.get_mut(&event_id).map(|event| {
                event.attendees_count = (event.attendees_count + delta).max(0);
                event.attendees_count
            }))
        })
    }

    fn recount_attendees(&self, event_id: EventId) -> StoreFuture<'_, Option<i64>> {
        Box::pin(async move {
            self.check()?;
            let mut events = self.events.write().unwrap();
            let Some(event) = events.get_mut(&event_id) else {
                return Ok(None);
            };
            // Both locks stay held until the count is stored.
            event.attendees_count = match &self.participations {
                Some(participations) => {
                    let rows = participations.rows.write().unwrap();
                    count_rows(&rows, event_id)
                },
                None => 0,
            };
            Ok(Some(event.attendees_count))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.check() })
    }
}

type ParticipationRows = HashMap<(EventId, UserId), Participation>;

fn count_rows(rows: &ParticipationRows, event_id: EventId) -> i64 {
    let count = rows.keys().filter(|(id, _)| *id == event_id).count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// In-memory participation store.
///
/// # Example
///
/// ```
/// use eventhub_testing::InMemoryParticipationStore;
///
/// let store = InMemoryParticipationStore::new();
/// assert_eq!(store.len(), 0);
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryParticipationStore {
    rows: Arc<RwLock<ParticipationRows>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryParticipationStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation fail with a database error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total number of participations
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().unwrap().is_empty()
    }

    /// Live participations of one event, bypassing failure injection.
    #[must_use]
    pub fn live_count(&self, event_id: EventId) -> i64 {
        count_rows(&self.rows.read().unwrap(), event_id)
    }

    fn remove_event(&self, event_id: EventId) {
        self.rows
            .write()
            .unwrap()
            .retain(|(id, _), _| *id != event_id);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(injected_failure())
        } else {
            Ok(())
        }
    }
}

impl ParticipationStore for InMemoryParticipationStore {
    fn insert(&self, participation: Participation) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.check()?;
            let key = (participation.event_id, participation.attendee_id);
            let mut rows = self.rows.write().unwrap();
            if rows.contains_key(&key) {
                return Ok(false);
            }
            rows.insert(key, participation);
            Ok(true)
        })
    }

    fn remove(&self, event_id: EventId, attendee_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.check()?;
            Ok(self
                .rows
                .write()
                .unwrap()
                .remove(&(event_id, attendee_id))
                .is_some())
        })
    }

    fn exists(&self, event_id: EventId, attendee_id: UserId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            self.check()?;
            Ok(self
                .rows
                .read()
                .unwrap()
                .contains_key(&(event_id, attendee_id)))
        })
    }

    fn list_for_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Participation>> {
        Box::pin(async move {
            self.check()?;
            let mut rows: Vec<Participation> = self
                .rows
                .read()
                .unwrap()
                .values()
                .filter(|p| p.event_id == event_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| {
                a.joined_at
                    .cmp(&b.joined_at)
                    .then_with(|| a.attendee_id.cmp(&b.attendee_id))
            });
            Ok(rows)
        })
    }

    fn events_for_attendee(&self, attendee_id: UserId) -> StoreFuture<'_, Vec<EventId>> {
        Box::pin(async move {
            self.check()?;
            Ok(self
                .rows
                .read()
                .unwrap()
                .keys()
                .filter(|(_, user)| *user == attendee_id)
                .map(|(event_id, _)| *event_id)
                .collect())
        })
    }
}
