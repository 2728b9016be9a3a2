//! Application services.
//!
//! Services receive every collaborator explicitly and hold no global state.
//! [`Services::new`] wires both from one set of stores.

pub mod events;
pub mod rsvp;

pub use events::EventService;
pub use rsvp::RsvpService;

use eventhub_core::broadcast::{BroadcastEmitter, Broadcaster};
use eventhub_core::environment::Clock;
use eventhub_core::store::{EventStore, ParticipationStore};
use std::sync::Arc;

/// Both services, built over the same stores and broadcaster.
#[derive(Clone)]
pub struct Services {
    /// Event CRUD and search
    pub events: EventService,
    /// RSVP registration and cancellation
    pub rsvp: RsvpService,
    /// Event store, kept for readiness checks
    pub event_store: Arc<dyn EventStore>,
}

impl Services {
    /// Wire the services.
    #[must_use]
    pub fn new(
        event_store: Arc<dyn EventStore>,
        participations: Arc<dyn ParticipationStore>,
        broadcaster: Arc<dyn Broadcaster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let emitter = BroadcastEmitter::new(broadcaster);
        Self {
            events: EventService::new(Arc::clone(&event_store), emitter.clone(), Arc::clone(&clock)),
            rsvp: RsvpService::new(Arc::clone(&event_store), participations, emitter, clock),
            event_store,
        }
    }
}
