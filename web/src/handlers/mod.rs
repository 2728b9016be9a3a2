//! HTTP request handlers shared by every deployment of the service.

pub mod health;

// Re-export common handler utilities
pub use health::{HealthReport, HealthStatus, health_check, readiness};
