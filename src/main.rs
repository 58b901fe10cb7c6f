//! Campus bus reservation core: HTTP server binary.

use campus_bus::booking::BookingEngine;
use campus_bus::clock::SystemClock;
use campus_bus::config::Config;
use campus_bus::coord::CoordStore;
use campus_bus::evidence::{BlobStore, EvidenceService};
use campus_bus::operators::OperatorService;
use campus_bus::server::{build_router, AppState};
use campus_bus::stores::{
    AssignmentRepository, BookingRepository, Database, OperatorRepository, PassengerRepository,
    ReportRepository, TripRepository,
};
use campus_bus::telemetry::TelemetryPublisher;
use campus_bus::token::TokenService;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_bus=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting campus bus reservation core");

    let config = Arc::new(Config::from_env());
    info!(
        postgres_url = %config.postgres.url,
        redis_url = %config.redis.url,
        kafka_brokers = %config.telemetry.brokers,
        blob_url = %config.blob.url,
        "Configuration loaded"
    );

    info!("Connecting to identity store...");
    let db = Database::connect(&config.postgres).await?;
    db.migrate().await?;
    info!("Identity store ready");

    info!("Connecting to coordination store...");
    let coord = CoordStore::connect(&config.redis.url, config.redis.lock_ttl_seconds).await?;
    info!("Coordination store ready");

    let telemetry = TelemetryPublisher::new(&config.telemetry)?;
    let blob = BlobStore::from_url(&config.blob.url)?;
    let tokens = TokenService::new(&config.tokens);
    let clock = Arc::new(SystemClock);

    let pool = db.pool().clone();
    let engine = BookingEngine::new(db.clone(), coord, tokens.clone(), clock.clone());
    let operators = OperatorService::new(
        OperatorRepository::new(pool.clone()),
        TripRepository::new(pool.clone()),
        AssignmentRepository::new(pool.clone()),
        tokens.clone(),
        clock.clone(),
    );
    let evidence = EvidenceService::new(blob, ReportRepository::new(pool.clone()), clock.clone());

    let state = AppState {
        config: config.clone(),
        clock,
        tokens,
        db,
        engine,
        operators,
        telemetry,
        evidence,
        passengers: PassengerRepository::new(pool.clone()),
        trips: TripRepository::new(pool.clone()),
        bookings: BookingRepository::new(pool),
    };

    let router = build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received ctrl-c, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
