//! # Eventhub Core
//!
//! Domain types and collaborator traits for the event management service.
//!
//! This crate provides:
//!
//! - **Types**: events, participations, identifiers, inputs ([`types`])
//! - **Errors**: the service error taxonomy ([`error`])
//! - **Stores**: the [`store::EventStore`] and [`store::ParticipationStore`] traits
//! - **Broadcasts**: the [`broadcast::Broadcaster`] trait and the fire-and-forget emitter
//! - **Environment**: injected clock ([`environment`])
//! - **Authorization**: the single host-ownership predicate ([`authorize_host`])
//!
//! Services in `eventhub-service` receive every collaborator explicitly as
//! `Arc<dyn Trait>`; nothing here holds global state.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broadcast;
pub mod error;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use error::{ServiceError, StoreError};
pub use types::{Event, EventId, UserId};

/// Environment module - injected dependencies that are not stores.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use eventhub_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// let _now = clock.now();
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

/// Check that `caller` owns `event`.
///
/// Update, delete, attendee listing and reconciliation all go through this.
///
/// # Errors
///
/// Returns [`ServiceError::Forbidden`] if the caller is not the host.
pub fn authorize_host(event: &Event, caller: UserId) -> Result<(), ServiceError> {
    if event.host_id == caller {
        Ok(())
    } else {
        Err(ServiceError::not_host())
    }
}
