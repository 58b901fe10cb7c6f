//! Router configuration.
//!
//! Builds the complete Axum router. The boundary stays thin: each route maps
//! to one handler, and the handler's extractor types decide which token
//! realm protects it.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{auth, boarding, bookings, operator, trips};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

/// Build the complete router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health (no authentication)
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Passenger realm
        .route("/auth/federated", post(auth::federated_login))
        .route("/auth/complete-profile", put(auth::complete_profile))
        .route("/trips/available", get(trips::available_trips))
        .route("/trips", post(trips::create_trip))
        .route("/bookings", post(bookings::book))
        .route("/bookings/history", get(bookings::history))
        .route("/bookings/:id", delete(bookings::cancel))
        .route("/profile", get(bookings::profile))
        // Operator realm
        .route("/operator/login", post(operator::login))
        .route("/operator/trips", get(operator::day_roster))
        .route("/operator/trips/start", post(operator::start_trip))
        .route("/operator/trips/end", post(operator::end_trip))
        .route(
            "/operator/trips/:tripId/passengers",
            get(operator::passenger_manifest),
        )
        .route("/boarding/validate", post(boarding::validate_boarding))
        .route("/operator/reports", post(operator::submit_report))
        .route("/operator/gps", post(operator::gps_update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
