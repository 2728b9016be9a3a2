//! Error taxonomy for the event management service.
//!
//! Two layers:
//!
//! - [`StoreError`]: what a persistence backend can report.
//! - [`ServiceError`]: what an operation reports to its caller. Each variant
//!   corresponds to exactly one HTTP status in the web layer.
//!
//! Broadcast failures have their own type ([`crate::broadcast::BroadcastError`])
//! and never reach callers.

use crate::types::EventId;
use thiserror::Error;

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur in a store backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Database connection or query failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A write referenced an event that does not exist.
    #[error("Event {0} does not exist")]
    EventNotFound(EventId),
}

/// Errors surfaced by service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Missing or malformed input.
    #[error("{0}")]
    Validation(String),

    /// The caller did not identify themselves.
    #[error("Authentication required")]
    Unauthorized,

    /// The caller is not allowed to touch this resource.
    #[error("{0}")]
    Forbidden(String),

    /// Event or participation does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The write collides with existing state (duplicate RSVP).
    #[error("{0}")]
    Conflict(String),

    /// Store failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Event lookup failed.
    #[must_use]
    pub fn event_not_found() -> Self {
        Self::NotFound("Event not found.".to_string())
    }

    /// Caller is not the event host.
    #[must_use]
    pub fn not_host() -> Self {
        Self::Forbidden("Forbidden: You are not the event host.".to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EventNotFound(_) => Self::event_not_found(),
            StoreError::DatabaseError(_) => Self::Internal(err.to_string()),
        }
    }
}
