//! Event management API endpoints.
//!
//! - `POST /events` - Create an event (requires identity)
//! - `GET /events` - Search events
//! - `GET /events/:event_id` - Get event details
//! - `PUT /events/:event_id` - Update an event (host only)
//! - `DELETE /events/:event_id` - Delete an event (host only)
//! - `GET /users/:user_id/events/hosted` - Events a user hosts

use super::path_param;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
};
use eventhub_core::UserId;
use eventhub_core::types::{Event, EventChanges, EventId, EventSummary, NewEvent};
use eventhub_web::{AppError, Caller};
use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response after creating an event.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEventResponse {
    /// Created event ID
    pub event_id: EventId,
    /// Success message
    pub message: String,
}

/// Response after updating an event.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEventResponse {
    /// Success message
    pub message: String,
    /// The event after the update
    pub event: Event,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Success message
    pub message: String,
}

/// Query parameters for searching events.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// Substring of title or description
    pub query: Option<String>,
    /// Lower bound, RFC 3339 or `YYYY-MM-DD`; defaults to now
    pub date: Option<String>,
    /// Exact category
    pub category: Option<String>,
}

impl SearchQuery {
    fn is_empty(&self) -> bool {
        self.query.is_none() && self.date.is_none() && self.category.is_none()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new event. The caller becomes the host.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:3001/events \
///   -H "X-User-Id: 7d0c7c1e-6a5e-4c36-9d4b-3c8f2d1e9a10" \
///   -H "Content-Type: application/json" \
///   -d '{"title": "Launch", "location": "HQ", "date_time": "2030-01-01T00:00:00Z"}'
/// ```
///
/// # Errors
///
/// 400 on a malformed body or missing fields, 401 without identity.
pub async fn create_event(
    State(state): State<AppState>,
    Caller(host): Caller,
    body: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let Json(input) = body?;
    let event = state.services.events.create(host, input).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            event_id: event.event_id,
            message: "Event created successfully and broadcasted.".to_string(),
        }),
    ))
}

/// Search events. Without parameters, lists every upcoming event.
///
/// # Errors
///
/// 400 if `date` cannot be parsed.
pub async fn search_events(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    let events = if params.is_empty() {
        state.services.events.list_upcoming().await?
    } else {
        state
            .services
            .events
            .search(params.query, params.date.as_deref(), params.category)
            .await?
    };
    Ok(Json(events))
}

/// Get event details.
///
/// # Errors
///
/// 404 if the event does not exist.
pub async fn get_event(
    State(state): State<AppState>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<Event>, AppError> {
    let event_id = path_param(path)?;
    Ok(Json(state.services.events.get(event_id).await?))
}

/// Update an event. Only supplied fields change.
///
/// # Errors
///
/// 404 if missing, 403 if the caller is not the host, 400 if nothing
/// updatable was supplied.
pub async fn update_event(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<EventId>, PathRejection>,
    body: Result<Json<EventChanges>, JsonRejection>,
) -> Result<Json<UpdateEventResponse>, AppError> {
    let event_id = path_param(path)?;
    let Json(changes) = body?;
    let event = state
        .services
        .events
        .update(event_id, caller, changes)
        .await?;

    Ok(Json(UpdateEventResponse {
        message: "Event updated successfully and broadcasted.".to_string(),
        event,
    }))
}

/// Delete an event.
///
/// # Errors
///
/// 404 if missing, 403 if the caller is not the host.
pub async fn delete_event(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let event_id = path_param(path)?;
    state.services.events.delete(event_id, caller).await?;

    Ok(Json(MessageResponse {
        message: "Event deleted successfully.".to_string(),
    }))
}

/// Events hosted by a user, latest first.
///
/// # Errors
///
/// 400 if the user id is malformed.
pub async fn events_hosted(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    let host = path_param(path)?;
    Ok(Json(state.services.events.events_hosted(host).await?))
}
