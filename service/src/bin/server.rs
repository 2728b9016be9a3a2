//! Event Management Server
//!
//! This binary:
//! - Connects to `PostgreSQL` and runs the bundled migrations
//! - Connects a producer to `RedPanda` for broadcasts
//! - Exposes Prometheus metrics on a separate listener
//! - Serves the HTTP API until Ctrl+C, then flushes pending broadcasts
//!
//! # Usage
//!
//! ```bash
//! # Start infrastructure
//! docker compose up -d
//!
//! # Run server
//! cargo run --bin server
//! ```

use eventhub_core::environment::SystemClock;
use eventhub_postgres::{PostgresEventStore, PostgresParticipationStore};
use eventhub_redpanda::RedpandaBroadcaster;
use eventhub_service::metrics::register_business_metrics;
use eventhub_service::{AppState, Config, Services, build_router};
use metrics_exporter_prometheus::PrometheusBuilder;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,eventhub=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting event management server...");

    let config = Config::from_env();
    tracing::info!(
        redpanda = %config.redpanda.brokers,
        bind = %config.bind_address(),
        "Configuration loaded"
    );

    // Metrics exporter
    let metrics_addr: SocketAddr = config.metrics_address().parse()?;
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()?;
    register_business_metrics();
    tracing::info!(address = %metrics_addr, "Metrics exporter listening");

    // Database
    let pool = PgPoolOptions::new()
        .max_connections(config.postgres.max_connections)
        .min_connections(config.postgres.min_connections)
        .acquire_timeout(Duration::from_secs(config.postgres.connect_timeout))
        .idle_timeout(Some(Duration::from_secs(config.postgres.idle_timeout)))
        .connect(&config.postgres.url)
        .await?;
    tracing::info!("PostgreSQL connected");

    let event_store = PostgresEventStore::from_pool(pool.clone());
    if config.postgres.run_migrations {
        event_store.migrate().await?;
        tracing::info!("Migrations complete");
    }
    let participations = PostgresParticipationStore::from_pool(pool.clone());

    // Broker
    let broadcaster = Arc::new(
        RedpandaBroadcaster::builder()
            .brokers(config.redpanda.brokers.clone())
            .producer_acks(config.redpanda.producer_acks.clone())
            .compression(config.redpanda.compression.clone())
            .timeout(Duration::from_millis(config.redpanda.timeout_ms))
            .topic_prefix(config.redpanda.topic_prefix.clone())
            .client_id(config.redpanda.client_id.clone())
            .build()?,
    );
    tracing::info!(brokers = %broadcaster.brokers(), "RedPanda producer ready");

    let services = Services::new(
        Arc::new(event_store),
        Arc::new(participations),
        broadcaster.clone(),
        Arc::new(SystemClock),
    );
    let app = build_router(AppState::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down gracefully...");

    let timeout = Duration::from_secs(config.server.shutdown_timeout);
    let flushing = Arc::clone(&broadcaster);
    match tokio::task::spawn_blocking(move || flushing.flush(timeout)).await? {
        Ok(()) => tracing::info!("Pending broadcasts flushed"),
        Err(e) => tracing::warn!(error = %e, "Broadcasts still pending at shutdown"),
    }
    pool.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
