//! Broadcast abstraction for notifying downstream consumers.
//!
//! Every state change is persisted first and broadcast second:
//!
//! ```text
//! ┌─────────────────┐
//! │  1. Write row   │
//! │   to Postgres   │◄─── Source of truth
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ 2. Publish to   │
//! │   broker topic  │◄─── Best effort
//! └────────┬────────┘
//!          │
//!     ┌────┴─────────┐
//!     ▼              ▼
//! ┌──────────┐ ┌───────────┐
//! │ Notifier │ │ Analytics │
//! └──────────┘ └───────────┘
//! ```
//!
//! A failed publish is logged and counted but never undoes step 1 and never
//! reaches the caller. There is no retry and no outbox; consumers may miss a
//! broadcast when the broker is down.
//!
//! # Topic Naming
//!
//! The topic is the kind tag (`event_created`, `rsvp_added`, ...), optionally
//! prefixed by the deployment (see `RedpandaBroadcaster`).
//!
//! # Implementations
//!
//! - `RecordingBroadcaster` (in `eventhub-testing`): captures messages, can be told to fail
//! - `RedpandaBroadcaster` (in `eventhub-redpanda`): Kafka-compatible producer

use crate::types::{Event, EventChanges, EventId, UserId};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while publishing a broadcast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// Failed to connect to the broker
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to serialize the payload
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

/// Kind tag of a broadcast. Determines the destination topic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastKind {
    /// A host created an event
    EventCreated,
    /// A host changed an event
    EventUpdated,
    /// A host deleted an event
    EventDeleted,
    /// A user registered for an event
    RsvpAdded,
    /// A user cancelled a registration
    RsvpCancelled,
}

impl BroadcastKind {
    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EventCreated => "event_created",
            Self::EventUpdated => "event_updated",
            Self::EventDeleted => "event_deleted",
            Self::RsvpAdded => "rsvp_added",
            Self::RsvpCancelled => "rsvp_cancelled",
        }
    }
}

impl fmt::Display for BroadcastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message for downstream consumers.
#[derive(Clone, Debug, PartialEq)]
pub struct Broadcast {
    /// Kind tag
    pub kind: BroadcastKind,
    /// Event the message is about; used as partition key
    pub event_id: EventId,
    /// JSON payload
    pub payload: Value,
}

impl Broadcast {
    /// `event_created` {event_id, host_id, title, date_time}
    #[must_use]
    pub fn event_created(event: &Event) -> Self {
        Self {
            kind: BroadcastKind::EventCreated,
            event_id: event.event_id,
            payload: json!({
                "event_id": event.event_id,
                "host_id": event.host_id,
                "title": event.title,
                "date_time": event.date_time,
            }),
        }
    }

    /// `event_updated` {event_id, host_id, changes}
    #[must_use]
    pub fn event_updated(event_id: EventId, host_id: UserId, changes: &EventChanges) -> Self {
        Self {
            kind: BroadcastKind::EventUpdated,
            event_id,
            payload: json!({
                "event_id": event_id,
                "host_id": host_id,
                "changes": changes,
            }),
        }
    }

    /// `event_deleted` {event_id, host_id}
    #[must_use]
    pub fn event_deleted(event_id: EventId, host_id: UserId) -> Self {
        Self {
            kind: BroadcastKind::EventDeleted,
            event_id,
            payload: json!({
                "event_id": event_id,
                "host_id": host_id,
            }),
        }
    }

    /// `rsvp_added` {event_id, user_id, timestamp}
    #[must_use]
    pub fn rsvp_added(event_id: EventId, user_id: UserId, timestamp: DateTime<Utc>) -> Self {
        Self::rsvp(BroadcastKind::RsvpAdded, event_id, user_id, timestamp)
    }

    /// `rsvp_cancelled` {event_id, user_id, timestamp}
    #[must_use]
    pub fn rsvp_cancelled(event_id: EventId, user_id: UserId, timestamp: DateTime<Utc>) -> Self {
        Self::rsvp(BroadcastKind::RsvpCancelled, event_id, user_id, timestamp)
    }

    fn rsvp(
        kind: BroadcastKind,
        event_id: EventId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind,
            event_id,
            payload: json!({
                "event_id": event_id,
                "user_id": user_id,
                "timestamp": timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            }),
        }
    }
}

/// Trait for broker implementations.
///
/// Publishing is best effort. Implementations report failures; deciding to
/// swallow them is the job of [`BroadcastEmitter`].
pub trait Broadcaster: Send + Sync {
    /// Publish one broadcast to the topic for its kind.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::PublishFailed`] if the broker rejects or times
    /// out the message.
    fn publish(
        &self,
        broadcast: &Broadcast,
    ) -> Pin<Box<dyn Future<Output = Result<(), BroadcastError>> + Send + '_>>;
}

/// Fire-and-forget front for a [`Broadcaster`].
///
/// Runs after the primary write. Failures are logged at `warn`, counted in
/// `eventhub_broadcast_failures_total`, and dropped.
#[derive(Clone)]
pub struct BroadcastEmitter {
    broadcaster: Arc<dyn Broadcaster>,
}

impl BroadcastEmitter {
    /// Wrap a broadcaster.
    #[must_use]
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self { broadcaster }
    }

    /// Publish, swallowing any failure.
    pub async fn emit(&self, broadcast: Broadcast) {
        match self.broadcaster.publish(&broadcast).await {
            Ok(()) => {
                tracing::debug!(
                    kind = %broadcast.kind,
                    event_id = %broadcast.event_id,
                    "Broadcast published"
                );
            }
            Err(e) => {
                tracing::warn!(
                    kind = %broadcast.kind,
                    event_id = %broadcast.event_id,
                    error = %e,
                    "Broadcast failed; primary write kept"
                );
                metrics::counter!(
                    "eventhub_broadcast_failures_total",
                    "kind" => broadcast.kind.as_str()
                )
                .increment(1);
            }
        }
    }
}

impl fmt::Debug for BroadcastEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastEmitter").finish_non_exhaustive()
    }
}
