//! RSVP registration and cancellation.
//!
//! A registration is two writes and a broadcast:
//!
//! 1. insert the participation row (the store rejects duplicates)
//! 2. adjust `attendees_count` by one, relative to its current value
//! 3. broadcast, best effort
//!
//! The two writes are not atomic. If step 2 fails, the counter is recomputed
//! from live rows before the error is returned, and [`RsvpService::reconcile`]
//! repairs any counter that still drifted. Both recount through
//! [`EventStore::recount_attendees`], never by counting here and writing back.
//!
//! An event deleted between the existence check and step 1 surfaces from the
//! store as `StoreError::EventNotFound`, which maps to `NotFound`.

use eventhub_core::broadcast::{Broadcast, BroadcastEmitter};
use eventhub_core::environment::Clock;
use eventhub_core::error::Result;
use eventhub_core::store::{EventStore, ParticipationStore};
use eventhub_core::types::{Event, EventId, EventSummary, Participation};
use eventhub_core::{ServiceError, UserId, authorize_host};
use std::sync::Arc;

/// RSVP orchestration over the two stores and the broadcaster.
#[derive(Clone)]
pub struct RsvpService {
    events: Arc<dyn EventStore>,
    participations: Arc<dyn ParticipationStore>,
    emitter: BroadcastEmitter,
    clock: Arc<dyn Clock>,
}

impl RsvpService {
    /// Create the service from its collaborators.
    #[must_use]
    pub fn new(
        events: Arc<dyn EventStore>,
        participations: Arc<dyn ParticipationStore>,
        emitter: BroadcastEmitter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            participations,
            emitter,
            clock,
        }
    }

    /// Register `attendee` for an event. Returns the new attendee count.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the event does not exist
    /// - [`ServiceError::Conflict`] if the attendee is already registered
    /// - [`ServiceError::Internal`] if a store write fails
    #[tracing::instrument(skip(self), fields(event_id = %event_id, attendee_id = %attendee))]
    pub async fn register(&self, event_id: EventId, attendee: UserId) -> Result<i64> {
        self.require_event(event_id).await?;

        let now = self.clock.now();
        let inserted = self
            .participations
            .insert(Participation {
                event_id,
                attendee_id: attendee,
                joined_at: now,
            })
            .await?;
        if !inserted {
            tracing::debug!("Duplicate registration rejected");
            return Err(ServiceError::Conflict(
                "User is already registered for this event.".to_string(),
            ));
        }

        let count = self.adjust_counter(event_id, 1).await?;
        metrics::counter!("eventhub_rsvps_total", "action" => "register").increment(1);
        tracing::info!(attendees_count = count, "RSVP recorded");

        self.emitter
            .emit(Broadcast::rsvp_added(event_id, attendee, now))
            .await;
        Ok(count)
    }

    /// Cancel `attendee`'s registration. Returns the new attendee count.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if there is no such registration
    /// - [`ServiceError::Internal`] if a store write fails
    #[tracing::instrument(skip(self), fields(event_id = %event_id, attendee_id = %attendee))]
    pub async fn cancel(&self, event_id: EventId, attendee: UserId) -> Result<i64> {
        if !self.participations.remove(event_id, attendee).await? {
            return Err(ServiceError::NotFound(
                "RSVP not found for this user and event.".to_string(),
            ));
        }

        let count = self.adjust_counter(event_id, -1).await?;
        metrics::counter!("eventhub_rsvps_total", "action" => "cancel").increment(1);
        tracing::info!(attendees_count = count, "RSVP cancelled");

        self.emitter
            .emit(Broadcast::rsvp_cancelled(event_id, attendee, self.clock.now()))
            .await;
        Ok(count)
    }

    /// Whether `caller` is registered. Anonymous callers are not.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if the store fails.
    pub async fn status(&self, event_id: EventId, caller: Option<UserId>) -> Result<bool> {
        match caller {
            Some(user) => Ok(self.participations.exists(event_id, user).await?),
            None => Ok(false),
        }
    }

    /// Participations of an event, earliest first. Host only.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the event does not exist
    /// - [`ServiceError::Forbidden`] if `caller` is not the host
    /// - [`ServiceError::Internal`] if the store fails
    pub async fn attendees(&self, event_id: EventId, caller: UserId) -> Result<Vec<Participation>> {
        let event = self.require_event(event_id).await?;
        authorize_host(&event, caller)?;
        Ok(self.participations.list_for_event(event_id).await?)
    }

    /// Events `user` is registered for, soonest first.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Internal`] if a store fails.
    pub async fn events_attending(&self, user: UserId) -> Result<Vec<EventSummary>> {
        let ids = self.participations.events_for_attendee(user).await?;
        let events = self.events.get_many(ids).await?;
        Ok(events.iter().map(Event::summary).collect())
    }

    /// Recompute `attendees_count` from live participation rows. Host only.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::NotFound`] if the event does not exist
    /// - [`ServiceError::Forbidden`] if `caller` is not the host
    /// - [`ServiceError::Internal`] if a store fails
    #[tracing::instrument(skip(self), fields(event_id = %event_id))]
    pub async fn reconcile(&self, event_id: EventId, caller: UserId) -> Result<i64> {
        let event = self.require_event(event_id).await?;
        authorize_host(&event, caller)?;

        let live = self.recount(event_id).await?;
        if live != event.attendees_count {
            tracing::warn!(
                cached = event.attendees_count,
                live,
                "Attendee counter drifted; repaired"
            );
        }
        Ok(live)
    }

    async fn require_event(&self, event_id: EventId) -> Result<Event> {
        self.events
            .get(event_id)
            .await?
            .ok_or_else(ServiceError::event_not_found)
    }

    /// Counting and storing happen inside the store in one step.
    async fn recount(&self, event_id: EventId) -> Result<i64> {
        let live = self
            .events
            .recount_attendees(event_id)
            .await?
            .ok_or_else(ServiceError::event_not_found)?;
        metrics::counter!("eventhub_counter_repairs_total").increment(1);
        Ok(live)
    }

    /// Adjust the counter after a participation write. On failure, try a
    /// recount so the counter converges, and report the original error.
    async fn adjust_counter(&self, event_id: EventId, delta: i64) -> Result<i64> {
        match self.events.adjust_attendees(event_id, delta).await {
            Ok(Some(count)) => Ok(count),
            // Event deleted between the participation write and the counter
            // update; the cascade already removed the row.
            Ok(None) => Err(ServiceError::event_not_found()),
            Err(e) => {
                tracing::error!(error = %e, delta, "Counter adjustment failed; recounting");
                if let Err(repair) = self.recount(event_id).await {
                    tracing::error!(error = %repair, "Recount failed; counter may drift until reconciled");
                }
                Err(e.into())
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use eventhub_core::broadcast::BroadcastKind;
    use eventhub_core::error::StoreError;
    use eventhub_core::store::StoreFuture;
    use eventhub_core::types::{EventChanges, NewEvent, SearchFilter};
    use eventhub_testing::properties::{RsvpOp, rsvp_ops};
    use eventhub_testing::{
        InMemoryEventStore, InMemoryParticipationStore, RecordingBroadcaster, test_clock,
    };
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        rsvp: RsvpService,
        events: InMemoryEventStore,
        participations: InMemoryParticipationStore,
        broadcaster: RecordingBroadcaster,
        event_id: EventId,
        host: UserId,
    }

    async fn fixture() -> Fixture {
        let participations = InMemoryParticipationStore::new();
        let events = InMemoryEventStore::cascading_to(participations.clone());
        let broadcaster = RecordingBroadcaster::new();
        let clock = test_clock();

        let host = UserId::new();
        let input = NewEvent {
            title: Some("Launch".to_string()),
            location: Some("HQ".to_string()),
            date_time: Some(clock.now()),
            ..NewEvent::default()
        }
        .validate()
        .unwrap();
        let event = Event::create(EventId::new(), host, input, clock.now());
        let event_id = event.event_id;
        events.insert(event).await.unwrap();

        let rsvp = RsvpService::new(
            Arc::new(events.clone()),
            Arc::new(participations.clone()),
            BroadcastEmitter::new(Arc::new(broadcaster.clone())),
            Arc::new(clock),
        );
        Fixture {
            rsvp,
            events,
            participations,
            broadcaster,
            event_id,
            host,
        }
    }

    fn count(f: &Fixture) -> i64 {
        f.events.snapshot(f.event_id).unwrap().attendees_count
    }

    #[tokio::test]
    async fn register_twice_conflicts_without_double_counting() {
        let f = fixture().await;
        let attendee = UserId::new();

        assert_eq!(f.rsvp.register(f.event_id, attendee).await.unwrap(), 1);
        let err = f.rsvp.register(f.event_id, attendee).await.unwrap_err();

        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(count(&f), 1);
        assert_eq!(f.broadcaster.of_kind(BroadcastKind::RsvpAdded).len(), 1);
    }

    #[tokio::test]
    async fn register_for_missing_event_is_not_found() {
        let f = fixture().await;
        let err = f.rsvp.register(EventId::new(), UserId::new()).await.unwrap_err();
        assert_eq!(err, ServiceError::event_not_found());
        assert!(f.participations.is_empty());
    }

    #[tokio::test]
    async fn cancel_without_registration_is_not_found() {
        let f = fixture().await;
        f.rsvp.register(f.event_id, UserId::new()).await.unwrap();

        let err = f.rsvp.cancel(f.event_id, UserId::new()).await.unwrap_err();

        assert!(matches!(err, ServiceError::NotFound(_)));
        assert_eq!(count(&f), 1);
    }

    #[tokio::test]
    async fn cancel_decrements_and_broadcasts() {
        let f = fixture().await;
        let attendee = UserId::new();
        f.rsvp.register(f.event_id, attendee).await.unwrap();

        assert_eq!(f.rsvp.cancel(f.event_id, attendee).await.unwrap(), 0);
        assert!(!f.rsvp.status(f.event_id, Some(attendee)).await.unwrap());
        let sent = f.broadcaster.of_kind(BroadcastKind::RsvpCancelled);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].payload["user_id"], serde_json::json!(attendee));
    }

    #[tokio::test]
    async fn broadcast_failure_keeps_registration() {
        let f = fixture().await;
        f.broadcaster.set_failing(true);
        let attendee = UserId::new();

        assert_eq!(f.rsvp.register(f.event_id, attendee).await.unwrap(), 1);
        assert!(f.rsvp.status(f.event_id, Some(attendee)).await.unwrap());
        assert_eq!(count(&f), 1);
    }

    #[tokio::test]
    async fn anonymous_status_is_false() {
        let f = fixture().await;
        assert!(!f.rsvp.status(f.event_id, None).await.unwrap());
    }

    #[tokio::test]
    async fn failed_adjustment_recounts_and_reports_internal() {
        let f = fixture().await;
        f.rsvp.register(f.event_id, UserId::new()).await.unwrap();
        f.events.set_failing_adjustments(true);

        let err = f.rsvp.register(f.event_id, UserId::new()).await.unwrap_err();

        assert!(matches!(err, ServiceError::Internal(_)));
        // The row exists and the recount brought the counter in line with it.
        assert_eq!(count(&f), 2);
        assert_eq!(f.participations.live_count(f.event_id), 2);
    }

    #[tokio::test]
    async fn attendees_are_host_only_and_ordered() {
        let f = fixture().await;
        let first = UserId::new();
        let second = UserId::new();
        f.rsvp.register(f.event_id, first).await.unwrap();
        f.rsvp.register(f.event_id, second).await.unwrap();

        assert_eq!(
            f.rsvp.attendees(f.event_id, first).await.unwrap_err(),
            ServiceError::not_host()
        );
        let list = f.rsvp.attendees(f.event_id, f.host).await.unwrap();
        assert_eq!(list.len(), 2);
        assert!(list[0].joined_at <= list[1].joined_at);
    }

    #[tokio::test]
    async fn reconcile_repairs_a_drifted_counter() {
        let f = fixture().await;
        f.rsvp.register(f.event_id, UserId::new()).await.unwrap();
        let mut drifted = f.events.snapshot(f.event_id).unwrap();
        drifted.attendees_count = 7;
        f.events.put(drifted);

        assert_eq!(f.rsvp.reconcile(f.event_id, f.host).await.unwrap(), 1);
        assert_eq!(count(&f), 1);
    }

    /// Event store whose recount lets one registration (row, then +1)
    /// complete while the reconciliation is already under way.
    struct RegistrationDuringRecount {
        inner: InMemoryEventStore,
        participations: InMemoryParticipationStore,
        late_attendee: UserId,
        fired: AtomicBool,
    }

    impl EventStore for RegistrationDuringRecount {
        fn insert(&self, event: Event) -> StoreFuture<'_, ()> {
            self.inner.insert(event)
        }

        fn get(&self, event_id: EventId) -> StoreFuture<'_, Option<Event>> {
            self.inner.get(event_id)
        }

        fn update(
            &self,
            event_id: EventId,
            changes: EventChanges,
            now: DateTime<Utc>,
        ) -> StoreFuture<'_, Option<Event>> {
            self.inner.update(event_id, changes, now)
        }

        fn delete(&self, event_id: EventId) -> StoreFuture<'_, bool> {
            self.inner.delete(event_id)
        }

        fn search(&self, filter: SearchFilter) -> StoreFuture<'_, Vec<Event>> {
            self.inner.search(filter)
        }

        fn hosted_by(&self, host_id: UserId) -> StoreFuture<'_, Vec<Event>> {
            self.inner.hosted_by(host_id)
        }

        fn get_many(&self, event_ids: Vec<EventId>) -> StoreFuture<'_, Vec<Event>> {
            self.inner.get_many(event_ids)
        }

        fn adjust_attendees(&self, event_id: EventId, delta: i64) -> StoreFuture<'_, Option<i64>> {
            self.inner.adjust_attendees(event_id, delta)
        }

        fn recount_attendees(&self, event_id: EventId) -> StoreFuture<'_, Option<i64>> {
            Box::pin(async move {
                if !self.fired.swap(true, Ordering::SeqCst) {
                    let inserted = self
                        .participations
                        .insert(Participation {
                            event_id,
                            attendee_id: self.late_attendee,
                            joined_at: Utc::now(),
                        })
                        .await?;
                    assert!(inserted);
                    self.inner.adjust_attendees(event_id, 1).await?;
                }
                self.inner.recount_attendees(event_id).await
            })
        }
    }

    #[tokio::test]
    async fn registration_during_reconcile_is_not_lost() {
        let f = fixture().await;
        f.rsvp.register(f.event_id, UserId::new()).await.unwrap();
        let store = RegistrationDuringRecount {
            inner: f.events.clone(),
            participations: f.participations.clone(),
            late_attendee: UserId::new(),
            fired: AtomicBool::new(false),
        };
        let rsvp = RsvpService::new(
            Arc::new(store),
            Arc::new(f.participations.clone()),
            BroadcastEmitter::new(Arc::new(f.broadcaster.clone())),
            Arc::new(test_clock()),
        );

        let repaired = rsvp.reconcile(f.event_id, f.host).await.unwrap();

        assert_eq!(repaired, 2);
        assert_eq!(count(&f), 2);
        assert_eq!(f.participations.live_count(f.event_id), 2);
    }

    /// Participation store that reports the event as gone, as the foreign
    /// key does when a delete commits between the existence check and the
    /// insert.
    struct EventDeletedBeforeInsert;

    impl ParticipationStore for EventDeletedBeforeInsert {
        fn insert(&self, participation: Participation) -> StoreFuture<'_, bool> {
            Box::pin(async move { Err(StoreError::EventNotFound(participation.event_id)) })
        }

        fn remove(&self, _event_id: EventId, _attendee_id: UserId) -> StoreFuture<'_, bool> {
            Box::pin(async { Ok(false) })
        }

        fn exists(&self, _event_id: EventId, _attendee_id: UserId) -> StoreFuture<'_, bool> {
            Box::pin(async { Ok(false) })
        }

        fn list_for_event(&self, _event_id: EventId) -> StoreFuture<'_, Vec<Participation>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn events_for_attendee(&self, _attendee_id: UserId) -> StoreFuture<'_, Vec<EventId>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    #[tokio::test]
    async fn event_deleted_mid_registration_is_not_found() {
        let f = fixture().await;
        let rsvp = RsvpService::new(
            Arc::new(f.events.clone()),
            Arc::new(EventDeletedBeforeInsert),
            BroadcastEmitter::new(Arc::new(f.broadcaster.clone())),
            Arc::new(test_clock()),
        );

        let err = rsvp.register(f.event_id, UserId::new()).await.unwrap_err();

        assert_eq!(err, ServiceError::event_not_found());
        assert_eq!(count(&f), 0);
        assert!(f.broadcaster.published().is_empty());
    }

    #[tokio::test]
    async fn events_attending_lists_registered_events() {
        let f = fixture().await;
        let attendee = UserId::new();
        f.rsvp.register(f.event_id, attendee).await.unwrap();

        let attending = f.rsvp.events_attending(attendee).await.unwrap();
        assert_eq!(attending.len(), 1);
        assert_eq!(attending[0].event_id, f.event_id);
        assert!(f.rsvp.events_attending(UserId::new()).await.unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn counter_matches_live_rows(ops in rsvp_ops(4, 40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            runtime.block_on(async {
                let f = fixture().await;
                let users: Vec<UserId> = (0..4).map(|_| UserId::new()).collect();

                for op in ops {
                    // Conflicts and misses are expected outcomes here.
                    let _ = match op {
                        RsvpOp::Register(i) => f.rsvp.register(f.event_id, users[i]).await,
                        RsvpOp::Cancel(i) => f.rsvp.cancel(f.event_id, users[i]).await,
                    };
                    prop_assert_eq!(count(&f), f.participations.live_count(f.event_id));
                }
                Ok(())
            })?;
        }
    }
}
