//! Redpanda broadcaster for the event management service.
//!
//! This crate implements the [`Broadcaster`] trait from `eventhub-core` on top
//! of rdkafka, so it works against Redpanda or any Kafka-compatible broker.
//!
//! # Topics and keys
//!
//! Each broadcast kind has its own topic, `{topic_prefix}{kind}`:
//!
//! ```text
//! event_created   event_updated   event_deleted   rsvp_added   rsvp_cancelled
//! ```
//!
//! The message key is the event id, so every message about one event lands on
//! the same partition and keeps its order. The payload is the broadcast's JSON
//! body.
//!
//! # Delivery Semantics
//!
//! **Best effort.** The database write always happens first; a failed publish
//! is reported to the caller, which logs it and moves on. Nothing is retried
//! or stored for later.
//!
//! # Example
//!
//! ```no_run
//! use eventhub_redpanda::RedpandaBroadcaster;
//! use eventhub_core::broadcast::{Broadcast, Broadcaster};
//! use eventhub_core::types::{EventId, UserId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let broadcaster = RedpandaBroadcaster::new("localhost:9092")?;
//! broadcaster
//!     .publish(&Broadcast::event_deleted(EventId::new(), UserId::new()))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use eventhub_core::broadcast::{Broadcast, BroadcastError, BroadcastKind, Broadcaster};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Redpanda-backed [`Broadcaster`].
///
/// # Example
///
/// ```no_run
/// use eventhub_redpanda::RedpandaBroadcaster;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let broadcaster = RedpandaBroadcaster::builder()
///     .brokers("localhost:9092,localhost:9093")
///     .producer_acks("all")
///     .compression("lz4")
///     .topic_prefix("staging.")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RedpandaBroadcaster {
    /// Kafka producer for publishing broadcasts
    producer: FutureProducer,
    /// Broker addresses
    brokers: String,
    /// Delivery timeout per message
    timeout: Duration,
    /// Prepended to every topic name
    topic_prefix: String,
}

impl RedpandaBroadcaster {
    /// Create a broadcaster with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::ConnectionFailed`] if the producer cannot be
    /// created.
    pub fn new(brokers: &str) -> Result<Self, BroadcastError> {
        Self::builder().brokers(brokers).build()
    }

    /// Create a new builder.
    #[must_use]
    pub fn builder() -> RedpandaBroadcasterBuilder {
        RedpandaBroadcasterBuilder::default()
    }

    /// Get a reference to the brokers string.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.brokers
    }

    /// Topic that broadcasts of `kind` are written to.
    #[must_use]
    pub fn topic_for(&self, kind: BroadcastKind) -> String {
        topic_name(&self.topic_prefix, kind)
    }

    /// Wait for in-flight messages to be delivered.
    ///
    /// Blocks the calling thread for at most `timeout`. Call it once during
    /// shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::PublishFailed`] if messages are still queued
    /// when the timeout expires.
    pub fn flush(&self, timeout: Duration) -> Result<(), BroadcastError> {
        self.producer
            .flush(Timeout::After(timeout))
            .map_err(|e| BroadcastError::PublishFailed {
                topic: "*".to_string(),
                reason: format!("Flush failed: {e}"),
            })
    }
}

fn topic_name(prefix: &str, kind: BroadcastKind) -> String {
    format!("{prefix}{}", kind.as_str())
}

/// Builder for configuring a [`RedpandaBroadcaster`].
#[derive(Default)]
pub struct RedpandaBroadcasterBuilder {
    brokers: Option<String>,
    producer_acks: Option<String>,
    compression: Option<String>,
    timeout: Option<Duration>,
    topic_prefix: Option<String>,
    client_id: Option<String>,
}

impl RedpandaBroadcasterBuilder {
    /// Set the broker addresses.
    ///
    /// # Parameters
    ///
    /// - `brokers`: Comma-separated list of broker addresses (e.g., "localhost:9092")
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.brokers = Some(brokers.into());
        self
    }

    /// Set producer acknowledgment mode (`0`, `1` or `all`). Default: `1`.
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.producer_acks = Some(acks.into());
        self
    }

    /// Set compression type (`none`, `gzip`, `snappy`, `lz4`, `zstd`).
    /// Default: `none`.
    #[must_use]
    pub fn compression(mut self, compression: impl Into<String>) -> Self {
        self.compression = Some(compression.into());
        self
    }

    /// Set the per-message delivery timeout. Default: 5 seconds.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Prefix every topic name, e.g. `"staging."`. Default: none.
    #[must_use]
    pub fn topic_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.topic_prefix = Some(prefix.into());
        self
    }

    /// Set the client id reported to the broker. Default: `eventhub`.
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Build the broadcaster.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::ConnectionFailed`] if:
    /// - Brokers not set
    /// - Cannot create producer
    /// - Invalid configuration
    pub fn build(self) -> Result<RedpandaBroadcaster, BroadcastError> {
        let brokers = self.brokers.ok_or_else(|| {
            BroadcastError::ConnectionFailed("Brokers not configured".to_string())
        })?;
        let timeout = self.timeout.unwrap_or(Duration::from_secs(5));
        let acks = self.producer_acks.as_deref().unwrap_or("1");
        let compression = self.compression.as_deref().unwrap_or("none");

        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &brokers)
            .set("client.id", self.client_id.as_deref().unwrap_or("eventhub"))
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .set("acks", acks)
            .set("compression.type", compression)
            .create()
            .map_err(|e| {
                BroadcastError::ConnectionFailed(format!("Failed to create producer: {e}"))
            })?;

        tracing::info!(
            brokers = %brokers,
            acks,
            compression,
            topic_prefix = self.topic_prefix.as_deref().unwrap_or(""),
            "RedpandaBroadcaster created"
        );

        Ok(RedpandaBroadcaster {
            producer,
            brokers,
            timeout,
            topic_prefix: self.topic_prefix.unwrap_or_default(),
        })
    }
}

impl Broadcaster for RedpandaBroadcaster {
    fn publish(
        &self,
        broadcast: &Broadcast,
    ) -> Pin<Box<dyn Future<Output = Result<(), BroadcastError>> + Send + '_>> {
        let topic = self.topic_for(broadcast.kind);
        let key = broadcast.event_id.to_string();
        let payload = serde_json::to_vec(&broadcast.payload);
        let timeout = self.timeout;

        Box::pin(async move {
            let payload =
                payload.map_err(|e| BroadcastError::SerializationFailed(e.to_string()))?;

            let record = FutureRecord::to(&topic).payload(&payload).key(&key);

            match self.producer.send(record, Timeout::After(timeout)).await {
                Ok((partition, offset)) => {
                    tracing::debug!(
                        topic = %topic,
                        partition,
                        offset,
                        key = %key,
                        "Broadcast delivered"
                    );
                    Ok(())
                },
                Err((kafka_error, _)) => Err(BroadcastError::PublishFailed {
                    topic,
                    reason: kafka_error.to_string(),
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redpanda_broadcaster_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaBroadcaster>();
        assert_sync::<RedpandaBroadcaster>();
    }

    #[test]
    fn build_without_brokers_fails() {
        let result = RedpandaBroadcaster::builder().build();
        assert!(matches!(result, Err(BroadcastError::ConnectionFailed(_))));
    }

    #[test]
    fn topics_are_prefixed_kind_names() {
        assert_eq!(topic_name("", BroadcastKind::RsvpAdded), "rsvp_added");
        assert_eq!(
            topic_name("staging.", BroadcastKind::EventCreated),
            "staging.event_created"
        );
    }
}
