//! RSVP API endpoints.
//!
//! - `POST /events/:event_id/rsvp` - Register the caller
//! - `DELETE /events/:event_id/rsvp` - Cancel the caller's registration
//! - `GET /events/:event_id/rsvp-status` - Whether the caller is registered
//! - `GET /events/:event_id/attendees` - Attendee list (host only)
//! - `POST /events/:event_id/reconcile` - Recount attendees (host only)
//! - `GET /users/:user_id/events/attending` - Events a user attends

use super::path_param;
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use chrono::{DateTime, Utc};
use eventhub_core::UserId;
use eventhub_core::types::{EventId, EventSummary};
use eventhub_web::{AppError, Caller};
use serde::{Deserialize, Serialize};

/// Response to a registration or cancellation.
#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpResponse {
    /// Success message
    pub message: String,
    /// Attendee count after the change
    pub attendees_count: i64,
}

/// Registration status of the caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct RsvpStatusResponse {
    /// Whether the caller holds a registration
    pub is_rsvped: bool,
}

/// One attendee of an event.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttendeeEntry {
    /// Registered user
    pub attendee_id: UserId,
    /// When they registered
    pub joined_at: DateTime<Utc>,
}

/// Attendee list.
#[derive(Debug, Serialize, Deserialize)]
pub struct AttendeesResponse {
    /// Attendees, earliest registration first
    pub attendees: Vec<AttendeeEntry>,
}

/// Result of a recount.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileResponse {
    /// Event that was recounted
    pub event_id: EventId,
    /// Corrected count
    pub attendees_count: i64,
}

/// Register the caller for an event.
///
/// # Errors
///
/// 404 if the event does not exist, 409 if already registered.
pub async fn register(
    State(state): State<AppState>,
    Caller(attendee): Caller,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<RsvpResponse>, AppError> {
    let event_id = path_param(path)?;
    let attendees_count = state.services.rsvp.register(event_id, attendee).await?;

    Ok(Json(RsvpResponse {
        message: "RSVP recorded successfully.".to_string(),
        attendees_count,
    }))
}

/// Cancel the caller's registration.
///
/// # Errors
///
/// 404 if the caller is not registered.
pub async fn cancel(
    State(state): State<AppState>,
    Caller(attendee): Caller,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<RsvpResponse>, AppError> {
    let event_id = path_param(path)?;
    let attendees_count = state.services.rsvp.cancel(event_id, attendee).await?;

    Ok(Json(RsvpResponse {
        message: "RSVP successfully cancelled.".to_string(),
        attendees_count,
    }))
}

/// Whether the caller is registered. Works without identity.
///
/// # Errors
///
/// 500 if the store fails.
pub async fn status(
    State(state): State<AppState>,
    caller: Option<Caller>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<RsvpStatusResponse>, AppError> {
    let event_id = path_param(path)?;
    let is_rsvped = state
        .services
        .rsvp
        .status(event_id, caller.map(|Caller(user)| user))
        .await?;
    Ok(Json(RsvpStatusResponse { is_rsvped }))
}

/// List attendees of an event.
///
/// # Errors
///
/// 404 if missing, 403 if the caller is not the host.
pub async fn attendees(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<AttendeesResponse>, AppError> {
    let event_id = path_param(path)?;
    let attendees = state
        .services
        .rsvp
        .attendees(event_id, caller)
        .await?
        .into_iter()
        .map(|p| AttendeeEntry {
            attendee_id: p.attendee_id,
            joined_at: p.joined_at,
        })
        .collect();
    Ok(Json(AttendeesResponse { attendees }))
}

/// Recount an event's attendees from live registrations.
///
/// # Errors
///
/// 404 if missing, 403 if the caller is not the host.
pub async fn reconcile(
    State(state): State<AppState>,
    Caller(caller): Caller,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<ReconcileResponse>, AppError> {
    let event_id = path_param(path)?;
    let attendees_count = state.services.rsvp.reconcile(event_id, caller).await?;
    Ok(Json(ReconcileResponse {
        event_id,
        attendees_count,
    }))
}

/// Events a user is registered for, soonest first.
///
/// # Errors
///
/// 400 if the user id is malformed.
pub async fn events_attending(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> Result<Json<Vec<EventSummary>>, AppError> {
    let user = path_param(path)?;
    Ok(Json(state.services.rsvp.events_attending(user).await?))
}
