//! # Eventhub Testing
//!
//! Testing utilities for the event management service.
//!
//! This crate provides:
//! - In-memory implementations of the store traits
//! - A broadcaster that records messages and can be switched to failing
//! - A fixed clock for deterministic timestamps
//! - proptest strategies for RSVP operation sequences
//!
//! ## Example
//!
//! ```ignore
//! use eventhub_testing::{InMemoryEventStore, InMemoryParticipationStore, RecordingBroadcaster};
//!
//! #[tokio::test]
//! async fn registers_once() {
//!     let events = Arc::new(InMemoryEventStore::new());
//!     let participations = Arc::new(InMemoryParticipationStore::new());
//!     let broadcaster = Arc::new(RecordingBroadcaster::new());
//!     let rsvp = RsvpService::new(events, participations, emitter, clock);
//!     // ...
//! }
//! ```

use chrono::{DateTime, Utc};
use eventhub_core::environment::Clock;

pub mod broadcaster;
pub mod stores;

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::advance`].
    /// Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use eventhub_testing::mocks::FixedClock;
    /// use eventhub_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward.
        #[allow(clippy::unwrap_used)] // Test infrastructure
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.write().unwrap();
            *time += by;
        }
    }

    impl Clock for FixedClock {
        #[allow(clippy::unwrap_used)] // Test infrastructure
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;

    /// One step of an RSVP sequence, over a small pool of attendees so that
    /// duplicates and misses actually happen.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum RsvpOp {
        /// Register attendee `n`
        Register(usize),
        /// Cancel attendee `n`
        Cancel(usize),
    }

    /// Strategy for a single operation against `attendees` users.
    pub fn rsvp_op(attendees: usize) -> impl Strategy<Value = RsvpOp> {
        prop_oneof![
            (0..attendees).prop_map(RsvpOp::Register),
            (0..attendees).prop_map(RsvpOp::Cancel),
        ]
    }

    /// Strategy for a sequence of up to `max_len` operations.
    pub fn rsvp_ops(attendees: usize, max_len: usize) -> impl Strategy<Value = Vec<RsvpOp>> {
        prop::collection::vec(rsvp_op(attendees), 0..max_len)
    }
}

// Re-export commonly used items
pub use broadcaster::RecordingBroadcaster;
pub use mocks::{FixedClock, test_clock};
pub use stores::{InMemoryEventStore, InMemoryParticipationStore};
