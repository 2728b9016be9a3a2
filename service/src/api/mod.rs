//! HTTP API handlers.
//!
//! Handlers are thin: extract, call one service operation, shape the JSON.
//! Errors become `{code, message}` bodies through [`eventhub_web::AppError`].

pub mod events;
pub mod rsvp;

use axum::extract::Path;
use axum::extract::rejection::PathRejection;
use eventhub_web::AppError;

/// Unwrap a path extraction, turning a malformed id into a 400.
fn path_param<T>(path: Result<Path<T>, PathRejection>) -> Result<T, AppError> {
    path.map(|Path(value)| value).map_err(AppError::from)
}
