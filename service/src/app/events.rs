//! Event lifecycle: create, read, update, delete, search.

use eventhub_core::broadcast::{Broadcast, BroadcastEmitter};
use eventhub_core::environment::Clock;
use eventhub_core::error::Result;
use eventhub_core::store::EventStore;
use eventhub_core::types::{Event, EventChanges, EventId, EventSummary, NewEvent, SearchFilter};
use eventhub_core::{ServiceError, UserId, authorize_host};
use std::sync::Arc;

/// Event CRUD and search.
///
/// Every mutation writes to the store first and broadcasts afterwards; a
/// failed broadcast never fails or undoes the operation.
#[derive(Clone)]
pub struct EventService {
    events: Arc<dyn EventStore>,
    emitter: BroadcastEmitter,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Create the service from its collaborators.
    #[must_use]
    pub fn new(events: Arc<dyn EventStore>, emitter: BroadcastEmitter, clock: Arc<dyn Clock>) -> Self {
        Self {
            events,
            emitter,
            clock,
        }
    }

    /// Create an event owned by `host`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if title, location or date/time is missing
    /// - [`ServiceError::Internal`] if the store fails
    #[tracing::instrument(skip(self, input), fields(host_id = %host))]
    pub async fn create(&self, host: UserId, input: NewEvent) -> Result<Event> {
        let input = input.validate()?;
        let event = Event::create(EventId::new(), host, input, self.clock.now());

        self.events.insert(event.clone()).await?;
        metrics::counter!("eventhub_events_created_total").increment(1);
        tracing::info!(event_id = %event.event_id, "Event created");

        self.emitter.emit(Broadcast::event_created(&event)).await;
        Ok(event)
    }

    /// Fetch one event.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the event does not exist
    /// - [`ServiceError::Internal`] if the store fails
    pub async fn get(&self, event_id: EventId) -> Result<Event> {
        self.events
            .get(event_id)
            .await?
            .ok_or_else(ServiceError::event_not_found)
    }

    /// Apply `changes` on behalf of `caller`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the event does not exist
    /// - [`ServiceError::Forbidden`] if `caller` is not the host
    /// - [`ServiceError::Validation`] if nothing updatable was supplied
    /// - [`ServiceError::Internal`] if the store fails
    #[tracing::instrument(skip(self, changes), fields(caller = %caller))]
    pub async fn update(
        &self,
        event_id: EventId,
        caller: UserId,
        changes: EventChanges,
    ) -> Result<Event> {
        let event = self.get(event_id).await?;
        authorize_host(&event, caller)?;
        changes.validate()?;

        let updated = self
            .events
            .update(event_id, changes.clone(), self.clock.now())
            .await?
            .ok_or_else(|| {
                ServiceError::Validation("No changes made or invalid fields provided.".to_string())
            })?;
        tracing::info!("Event updated");

        self.emitter
            .emit(Broadcast::event_updated(event_id, event.host_id, &changes))
            .await;
        Ok(updated)
    }

    /// Delete an event and, through the store, all of its participations.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the event does not exist
    /// - [`ServiceError::Forbidden`] if `caller` is not the host
    /// - [`ServiceError::Internal`] if the store fails
    #[tracing::instrument(skip(self), fields(caller = %caller))]
    pub async fn delete(&self, event_id: EventId, caller: UserId) -> Result<()> {
        let event = self.get(event_id).await?;
        authorize_host(&event, caller)?;

        if !self.events.delete(event_id).await? {
            // Removed concurrently by another request from the host.
            return Err(ServiceError::event_not_found());
        }
        metrics::counter!("eventhub_events_deleted_total").increment(1);
        tracing::info!("Event deleted");

        self.emitter
            .emit(Broadcast::event_deleted(event_id, event.host_id))
            .await;
        Ok(())
    }

    /// Search events. A missing `date` means "from now on".
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Validation`] if `date` cannot be parsed
    /// - [`ServiceError::Internal`] if the store fails
    pub async fn search(
        &self,
        query: Option<String>,
        date: Option<&str>,
        category: Option<String>,
    ) -> Result<Vec<EventSummary>> {
        let filter = SearchFilter::from_params(query, date, category, self.clock.now())?;
        tracing::debug!(?filter, "Searching events");
        let events = self.events.search(filter).await?;
        Ok(events.iter().map(Event::summary).collect())
    }

    /// All events from now on, soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails.
    pub async fn list_upcoming(&self) -> Result<Vec<EventSummary>> {
        self.search(None, None, None).await
    }

    /// Events hosted by `host`, latest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails.
    pub async fn events_hosted(&self, host: UserId) -> Result<Vec<EventSummary>> {
        let events = self.events.hosted_by(host).await?;
        Ok(events.iter().map(Event::summary).collect())
    }
}
