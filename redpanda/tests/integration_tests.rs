//! Integration tests for [`RedpandaBroadcaster`] against a real Kafka broker.
//!
//! # Running These Tests
//!
//! Marked `#[ignore]` because they need Docker and take a while to start the
//! broker:
//!
//! ```bash
//! cargo test -p eventhub-redpanda --test integration_tests -- --ignored
//! ```

#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use chrono::Utc;
use eventhub_core::broadcast::{Broadcast, BroadcastKind, Broadcaster};
use eventhub_core::types::{EventId, UserId};
use eventhub_redpanda::RedpandaBroadcaster;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use std::time::Duration;
use testcontainers::ImageExt;
use testcontainers::runners::AsyncRunner;
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

/// Publish a warmup message until the broker accepts it.
async fn wait_for_kafka_ready(broadcaster: &RedpandaBroadcaster) {
    let warmup = Broadcast::event_deleted(EventId::new(), UserId::new());
    for attempt in 1..=60 {
        if broadcaster.publish(&warmup).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(500)).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(attempt != 60, "Kafka failed to become ready");
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn rsvp_broadcast_lands_on_prefixed_topic_keyed_by_event() {
    let kafka = Kafka::default()
        .with_env_var("KAFKA_AUTO_CREATE_TOPICS_ENABLE", "true")
        .start()
        .await
        .expect("Failed to start Kafka container");

    let host = kafka.get_host().await.expect("Failed to get host");
    let port = kafka
        .get_host_port_ipv4(KAFKA_PORT)
        .await
        .expect("Failed to get port");
    let brokers = format!("{host}:{port}");

    let broadcaster = RedpandaBroadcaster::builder()
        .brokers(&brokers)
        .topic_prefix("test.")
        .build()
        .expect("Failed to create broadcaster");
    wait_for_kafka_ready(&broadcaster).await;

    let event_id = EventId::new();
    let broadcast = Broadcast::rsvp_added(event_id, UserId::new(), Utc::now());
    broadcaster
        .publish(&broadcast)
        .await
        .expect("Failed to publish");
    broadcaster
        .flush(Duration::from_secs(5))
        .expect("Failed to flush");

    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", &brokers)
        .set("group.id", "eventhub-test")
        .set("auto.offset.reset", "earliest")
        .create()
        .expect("Failed to create consumer");
    let topic = broadcaster.topic_for(BroadcastKind::RsvpAdded);
    assert_eq!(topic, "test.rsvp_added");
    consumer.subscribe(&[&topic]).expect("Failed to subscribe");

    let message = tokio::time::timeout(Duration::from_secs(30), consumer.recv())
        .await
        .expect("Timed out waiting for message")
        .expect("Consumer error");

    let key = message.key().expect("message has a key");
    assert_eq!(key, event_id.to_string().as_bytes());

    let payload: serde_json::Value =
        serde_json::from_slice(message.payload().expect("message has a payload"))
            .expect("payload is JSON");
    assert_eq!(payload, broadcast.payload);
}
