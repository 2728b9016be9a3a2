//! Health check endpoints.
//!
//! Liveness is static; readiness pings the database through the event store.

use super::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use eventhub_web::handlers::{HealthReport, readiness};

pub use eventhub_web::handlers::health_check;

/// Readiness check endpoint.
///
/// # Example
///
/// ```bash
/// curl http://localhost:3001/ready
/// # {"component":"database","status":"Healthy","message":"Database reachable"}
/// ```
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    readiness(state.services.event_store.as_ref()).await
}
