//! Passenger booking endpoints: book, cancel, history, profile.

use super::{parse_uuid, Body};
use crate::auth::PassengerSession;
use crate::booking::{BookingOutcome, CancelOutcome};
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::stores::BookingSummary;
use crate::types::{BookingId, BookingStatus, TripId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Booking request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookRequest {
    /// Trip to book
    pub trip_id: Uuid,
}

/// Booking response: confirmed with a token, or waitlisted with a rank.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    /// The new booking
    pub booking_id: Uuid,
    /// CONFIRMED or WAITLIST
    pub status: BookingStatus,
    /// Boarding token, when confirmed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boarding_token: Option<String>,
    /// Waitlist rank, when waitlisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waitlist_position: Option<i32>,
    /// Human-readable outcome
    pub message: String,
}

/// Book a seat or join the waitlist.
pub async fn book(
    session: PassengerSession,
    State(state): State<AppState>,
    Body(request): Body<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>)> {
    let trip_id = TripId::from_uuid(request.trip_id);
    let outcome = state.engine.book(session.passenger_id, trip_id).await?;

    let response = match outcome {
        BookingOutcome::Confirmed {
            booking_id,
            boarding_token,
        } => BookResponse {
            booking_id: *booking_id.as_uuid(),
            status: BookingStatus::Confirmed,
            boarding_token: Some(boarding_token),
            waitlist_position: None,
            message: "Seat confirmed".to_string(),
        },
        BookingOutcome::Waitlisted {
            booking_id,
            position,
        } => BookResponse {
            booking_id: *booking_id.as_uuid(),
            status: BookingStatus::Waitlist,
            boarding_token: None,
            waitlist_position: Some(position),
            message: "Added to waitlist".to_string(),
        },
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Cancellation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    /// CANCELLED, or ALREADY_CANCELLED for the idempotent repeat
    pub status: String,
    /// Human-readable outcome
    pub message: String,
}

/// Cancel a booking; promotes the waitlist head when a seat frees up.
pub async fn cancel(
    session: PassengerSession,
    State(state): State<AppState>,
    Path(booking_id): Path<String>,
) -> Result<Json<CancelResponse>> {
    let booking_id = BookingId::from_uuid(parse_uuid(&booking_id)?);
    let outcome = state.engine.cancel(session.passenger_id, booking_id).await?;

    let response = match outcome {
        CancelOutcome::Cancelled { promoted: Some(_) } => CancelResponse {
            status: "CANCELLED".to_string(),
            message: "Booking cancelled and next waitlisted passenger promoted".to_string(),
        },
        CancelOutcome::Cancelled { promoted: None } => CancelResponse {
            status: "CANCELLED".to_string(),
            message: "Booking cancelled".to_string(),
        },
        CancelOutcome::AlreadyCancelled => CancelResponse {
            status: "ALREADY_CANCELLED".to_string(),
            message: "Booking was already cancelled".to_string(),
        },
    };
    Ok(Json(response))
}

/// All bookings of the passenger joined with trip summaries, newest first.
pub async fn history(
    session: PassengerSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<BookingSummary>>> {
    let rows = state
        .bookings
        .history_for_passenger(session.passenger_id)
        .await?;
    Ok(Json(rows))
}

/// Passenger profile: account fields plus live bookings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    /// Passenger identifier
    pub passenger_id: Uuid,
    /// Email on file
    pub email: String,
    /// Display name on file
    pub display_name: String,
    /// Room, when the profile is complete
    pub room: Option<String>,
    /// Phone, when the profile is complete
    pub phone: Option<String>,
    /// Whether room and phone are on file
    pub profile_complete: bool,
    /// Accumulated penalties
    pub penalty_count: i32,
    /// Live bookings with their trips
    pub active_bookings: Vec<BookingSummary>,
}

/// The authenticated passenger's profile and live bookings.
pub async fn profile(
    session: PassengerSession,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>> {
    let passenger = state
        .passengers
        .find(session.passenger_id)
        .await?
        .ok_or(Error::NotFound)?;
    let active_bookings = state
        .bookings
        .active_for_passenger(session.passenger_id)
        .await?;

    Ok(Json(ProfileResponse {
        passenger_id: *passenger.passenger_id.as_uuid(),
        email: passenger.email.clone(),
        display_name: passenger.display_name.clone(),
        room: passenger.room.clone(),
        phone: passenger.phone.clone(),
        profile_complete: passenger.profile_complete(),
        penalty_count: passenger.penalty_count,
        active_bookings,
    }))
}
