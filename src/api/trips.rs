//! Trip endpoints: availability listing and administrative creation.

use super::Body;
use crate::auth::PassengerSession;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{DayClass, Direction, Trip, TripId, TripStatus};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Query parameters for the availability listing.
#[derive(Debug, Deserialize)]
pub struct AvailableTripsQuery {
    /// Direction wire name
    pub route: String,
    /// Service date, `YYYY-MM-DD`
    pub date: String,
}

/// One trip with live seat counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTrip {
    /// Trip identifier
    pub trip_id: Uuid,
    /// Departure time, `HH:MM:SS`
    pub departure_time: String,
    /// Destination label
    pub destination: Option<String>,
    /// Bus label
    pub bus_label: Option<String>,
    /// Total seats
    pub capacity: i32,
    /// Seats occupied (confirmed + boarded)
    pub booked_count: i64,
    /// Waitlisted bookings
    pub waitlist_count: i64,
    /// Seats still open to students
    pub available_seats: i64,
    /// Schedule class
    pub day_class: DayClass,
}

/// Active trips for a route and date with real-time availability.
pub async fn available_trips(
    _session: PassengerSession,
    State(state): State<AppState>,
    Query(query): Query<AvailableTripsQuery>,
) -> Result<Json<Vec<AvailableTrip>>> {
    let direction = Direction::parse(&query.route).ok_or(Error::MalformedRequest)?;
    let date: NaiveDate = query.date.parse().map_err(|_| Error::MalformedRequest)?;

    let trips = state.trips.list_available(direction, date).await?;

    Ok(Json(
        trips
            .into_iter()
            .map(|t| AvailableTrip {
                trip_id: *t.trip.trip_id.as_uuid(),
                departure_time: t.trip.departure_time.format("%H:%M:%S").to_string(),
                destination: t.trip.destination.clone(),
                bus_label: t.trip.bus_label.clone(),
                capacity: t.trip.capacity,
                booked_count: t.booked_count,
                waitlist_count: t.waitlist_count,
                available_seats: t.available_seats().max(0),
                day_class: t.trip.day_class,
            })
            .collect(),
    ))
}

/// Administrative trip creation request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    /// Direction wire name
    pub route: String,
    /// Destination label
    pub destination: Option<String>,
    /// Bus label
    pub bus_label: Option<String>,
    /// Service date, `YYYY-MM-DD`
    pub trip_date: String,
    /// Departure time, `HH:MM` or `HH:MM:SS`
    pub departure_time: String,
    /// Total seats; defaults to 35, at most 50
    pub capacity: Option<i32>,
    /// Faculty reservation; defaults to 5, at most half of capacity
    pub faculty_reserved: Option<i32>,
    /// Schedule class; defaults to WEEKDAY
    pub day_class: Option<DayClass>,
}

/// Trip creation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripResponse {
    /// The new trip
    pub trip_id: Uuid,
}

/// Create a trip.
///
/// Administrative tooling authenticates with the session realm; see the
/// design notes.
pub async fn create_trip(
    _session: PassengerSession,
    State(state): State<AppState>,
    Body(request): Body<CreateTripRequest>,
) -> Result<(StatusCode, Json<CreateTripResponse>)> {
    let direction = Direction::parse(&request.route).ok_or(Error::MalformedRequest)?;
    let trip_date: NaiveDate = request
        .trip_date
        .parse()
        .map_err(|_| Error::MalformedRequest)?;
    let departure_time = parse_departure_time(&request.departure_time)?;

    let capacity = request.capacity.unwrap_or(35);
    let faculty_reserved = request.faculty_reserved.unwrap_or(5);
    validate_trip_shape(capacity, faculty_reserved)?;

    let now = state.clock.now();
    if trip_date < now.date_naive() {
        return Err(Error::MalformedRequest);
    }

    let trip = Trip {
        trip_id: TripId::new(),
        direction,
        destination: request.destination,
        bus_label: request.bus_label,
        trip_date,
        departure_time,
        capacity,
        faculty_reserved,
        status: TripStatus::Active,
        day_class: request.day_class.unwrap_or(DayClass::Weekday),
        created_at: now,
    };
    state.trips.create(&trip).await?;

    tracing::info!(trip_id = %trip.trip_id, direction = %direction, %trip_date, "trip created");
    Ok((
        StatusCode::CREATED,
        Json(CreateTripResponse {
            trip_id: *trip.trip_id.as_uuid(),
        }),
    ))
}

/// Capacity is bounded at 50 and the faculty reservation at half of
/// capacity.
fn validate_trip_shape(capacity: i32, faculty_reserved: i32) -> Result<()> {
    if !(1..=50).contains(&capacity) {
        return Err(Error::MalformedRequest);
    }
    if faculty_reserved < 0 || faculty_reserved > capacity / 2 {
        return Err(Error::MalformedRequest);
    }
    Ok(())
}

fn parse_departure_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Error::MalformedRequest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_and_faculty_bounds() {
        assert!(validate_trip_shape(35, 5).is_ok());
        assert!(validate_trip_shape(50, 25).is_ok());
        assert!(validate_trip_shape(1, 0).is_ok());

        assert!(validate_trip_shape(51, 5).is_err(), "over the bus limit");
        assert!(validate_trip_shape(0, 0).is_err());
        assert!(validate_trip_shape(35, 18).is_err(), "faculty over half");
        assert!(validate_trip_shape(35, -1).is_err());
    }

    #[test]
    fn departure_time_accepts_both_precisions() {
        assert_eq!(
            parse_departure_time("18:30").unwrap(),
            NaiveTime::from_hms_opt(18, 30, 0).unwrap()
        );
        assert_eq!(
            parse_departure_time("18:30:15").unwrap(),
            NaiveTime::from_hms_opt(18, 30, 15).unwrap()
        );
        assert!(parse_departure_time("6pm").is_err());
    }
}
