//! Axum integration for the event management service.
//!
//! This crate holds the HTTP pieces that are independent of any particular
//! route table:
//!
//! - [`AppError`]: maps [`eventhub_core::ServiceError`] to status codes and
//!   `{code, message}` bodies
//! - [`Caller`] and [`CorrelationId`] extractors
//! - [`correlation_id_layer`]: per-request span and `X-Correlation-ID` echo
//! - liveness and readiness handlers
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum handler
//! 2. **Extract** the caller, path parameters and JSON body
//! 3. **Call** the service operation
//! 4. **Map** the result (or `ServiceError`) to an HTTP response

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{Caller, CorrelationId, USER_ID_HEADER};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer};
