//! Business metrics for the event management service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `eventhub_events_created_total` - Total events created
//! - `eventhub_events_deleted_total` - Total events deleted
//! - `eventhub_rsvps_total{action}` - RSVP registrations and cancellations
//! - `eventhub_duplicate_rsvps_total` - Registrations rejected as duplicates
//! - `eventhub_counter_repairs_total` - Attendee counters recomputed from live rows
//! - `eventhub_broadcast_failures_total{kind}` - Broadcasts the broker did not accept

use metrics::describe_counter;

/// Register all metric descriptions. Call once at startup.
pub fn register_business_metrics() {
    describe_counter!(
        "eventhub_events_created_total",
        "Total number of events created"
    );
    describe_counter!(
        "eventhub_events_deleted_total",
        "Total number of events deleted"
    );
    describe_counter!(
        "eventhub_rsvps_total",
        "RSVP operations by action (register, cancel)"
    );
    describe_counter!(
        "eventhub_duplicate_rsvps_total",
        "Registrations rejected because the user was already registered"
    );
    describe_counter!(
        "eventhub_counter_repairs_total",
        "Attendee counters recomputed from live participation rows"
    );
    describe_counter!(
        "eventhub_broadcast_failures_total",
        "Broadcasts that failed to publish, by kind"
    );

    tracing::info!("Business metrics registered");
}
