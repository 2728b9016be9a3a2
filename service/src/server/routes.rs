//! Router configuration.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{events, rsvp};
use axum::{
    Router,
    routing::{get, post},
};
use eventhub_web::correlation_id_layer;

/// Build the complete Axum router.
///
/// Every route sits behind the correlation-id layer, so each response
/// carries `X-Correlation-ID` and each request runs inside an
/// `http_request` span.
pub fn build_router(state: AppState) -> Router {
    let event_routes = Router::new()
        .route(
            "/events",
            post(events::create_event).get(events::search_events),
        )
        .route(
            "/events/:event_id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/events/:event_id/rsvp",
            post(rsvp::register).delete(rsvp::cancel),
        )
        .route("/events/:event_id/rsvp-status", get(rsvp::status))
        .route("/events/:event_id/attendees", get(rsvp::attendees))
        .route("/events/:event_id/reconcile", post(rsvp::reconcile));

    let user_routes = Router::new()
        .route(
            "/users/:user_id/events/attending",
            get(rsvp::events_attending),
        )
        .route("/users/:user_id/events/hosted", get(events::events_hosted));

    Router::new()
        // Health checks (no identity required)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .merge(event_routes)
        .merge(user_routes)
        .layer(correlation_id_layer())
        .with_state(state)
}
