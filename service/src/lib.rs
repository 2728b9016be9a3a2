//! # Eventhub Service
//!
//! Event management microservice: hosts create, update and delete events;
//! users search them and RSVP. Each RSVP writes a participation row, keeps
//! the event's `attendees_count` in step, and broadcasts the change to
//! downstream consumers on a best-effort basis.
//!
//! ## Layout
//!
//! - [`config`]: environment configuration
//! - [`app`]: [`EventService`](app::EventService) and [`RsvpService`](app::RsvpService)
//! - [`api`]: axum handlers
//! - [`server`]: router and shared state
//! - [`metrics`]: metric descriptions
//!
//! The `server` binary wires the `PostgreSQL` stores and the Redpanda
//! broadcaster into these pieces.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod app;
pub mod config;
pub mod metrics;
pub mod server;

pub use app::{EventService, RsvpService, Services};
pub use config::Config;
pub use server::{AppState, build_router};
