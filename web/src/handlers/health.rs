//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{Json, http::StatusCode};
use eventhub_core::store::EventStore;
use serde::Serialize;

/// Overall health of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// Dependency reachable
    Healthy,
    /// Dependency unreachable
    Unhealthy,
}

/// Readiness report for one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Component that was checked
    pub component: String,
    /// Result of the check
    pub status: HealthStatus,
    /// Human-readable detail
    pub message: String,
}

/// Simple health check endpoint (for basic liveness).
///
/// Returns 200 OK to indicate the service is running.
/// This endpoint does NOT check dependencies (database, etc.).
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Readiness check against the event store.
///
/// # Status Codes
///
/// - 200 OK: the database answered
/// - 503 Service Unavailable: it did not
///
/// # Response
///
/// ```json
/// {
///   "component": "database",
///   "status": "Healthy",
///   "message": "Database reachable"
/// }
/// ```
pub async fn readiness(store: &dyn EventStore) -> (StatusCode, Json<HealthReport>) {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthReport {
                component: "database".to_string(),
                status: HealthStatus::Healthy,
                message: "Database reachable".to_string(),
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthReport {
                    component: "database".to_string(),
                    status: HealthStatus::Unhealthy,
                    message: e.to_string(),
                }),
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventhub_testing::InMemoryEventStore;

    #[tokio::test]
    async fn test_simple_health_check() {
        let (status, body) = health_check().await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn readiness_follows_the_store() {
        let store = InMemoryEventStore::new();

        let (status, Json(report)) = readiness(&store).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report.status, HealthStatus::Healthy);

        store.set_failing(true);
        let (status, Json(report)) = readiness(&store).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }
}
