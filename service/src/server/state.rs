//! Application state for the HTTP server.

use crate::app::Services;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is reference-counted underneath.
#[derive(Clone)]
pub struct AppState {
    /// Event and RSVP services
    pub services: Services,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(services: Services) -> Self {
        Self { services }
    }
}
