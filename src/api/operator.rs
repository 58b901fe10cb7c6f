//! Operator endpoints: login, day roster, assignments, manifest, reports,
//! and position telemetry.

use super::{parse_uuid, Body};
use crate::auth::OperatorSession;
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{BookingStatus, PassengerId, ReportReason, RosterStatus, TripId};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorLoginRequest {
    /// Employee ID
    pub employee_id: String,
    /// Password
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorLoginResponse {
    /// Operator session token (24-hour lifetime)
    pub token: String,
    /// Operator identifier
    pub operator_id: Uuid,
    /// Display name
    pub display_name: String,
}

/// Authenticate an operator.
pub async fn login(
    State(state): State<AppState>,
    Body(request): Body<OperatorLoginRequest>,
) -> Result<Json<OperatorLoginResponse>> {
    let login = state
        .operators
        .login(request.employee_id.trim(), &request.password)
        .await?;

    Ok(Json(OperatorLoginResponse {
        token: login.token,
        operator_id: *login.operator.operator_id.as_uuid(),
        display_name: login.operator.display_name,
    }))
}

/// One roster row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterTrip {
    /// Trip identifier
    pub trip_id: Uuid,
    /// Departure time, `HH:MM:SS`
    pub departure_time: String,
    /// Direction wire name
    pub direction: String,
    /// Destination label
    pub destination: Option<String>,
    /// Bus label
    pub bus_label: Option<String>,
    /// Derived status for this operator
    pub status: RosterStatus,
}

/// Day roster response.
#[derive(Debug, Serialize)]
pub struct RosterResponse {
    /// Today's trips with derived statuses
    pub trips: Vec<RosterTrip>,
    /// The roster date, `YYYY-MM-DD`
    pub date: String,
}

/// Today's trips for the authenticated operator.
pub async fn day_roster(
    session: OperatorSession,
    State(state): State<AppState>,
) -> Result<Json<RosterResponse>> {
    let today = state.clock.now().date_naive();
    let roster = state.operators.day_roster(session.operator_id, today).await?;

    Ok(Json(RosterResponse {
        trips: roster
            .into_iter()
            .map(|entry| RosterTrip {
                trip_id: *entry.trip.trip_id.as_uuid(),
                departure_time: entry.trip.departure_time.format("%H:%M:%S").to_string(),
                direction: entry.trip.direction.to_string(),
                destination: entry.trip.destination.clone(),
                bus_label: entry.trip.bus_label.clone(),
                status: entry.status,
            })
            .collect(),
        date: today.to_string(),
    }))
}

/// Assignment start request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartTripRequest {
    /// Trip to run
    pub trip_id: Uuid,
    /// Bus label for this run
    pub bus_label: String,
}

/// Assignment start/end response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    /// The assignment
    pub assignment_id: Uuid,
    /// IN_PROGRESS or COMPLETED
    pub status: crate::types::AssignmentStatus,
}

/// Start running a trip.
pub async fn start_trip(
    session: OperatorSession,
    State(state): State<AppState>,
    Body(request): Body<StartTripRequest>,
) -> Result<Json<AssignmentResponse>> {
    let assignment = state
        .operators
        .start_assignment(
            session.operator_id,
            TripId::from_uuid(request.trip_id),
            request.bus_label.trim(),
        )
        .await?;

    Ok(Json(AssignmentResponse {
        assignment_id: *assignment.assignment_id.as_uuid(),
        status: assignment.status,
    }))
}

/// Assignment end request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndTripRequest {
    /// Trip whose run is finished
    pub trip_id: Uuid,
}

/// Finish the caller's live run of a trip.
pub async fn end_trip(
    session: OperatorSession,
    State(state): State<AppState>,
    Body(request): Body<EndTripRequest>,
) -> Result<Json<AssignmentResponse>> {
    let assignment = state
        .operators
        .end_assignment(session.operator_id, TripId::from_uuid(request.trip_id))
        .await?;

    Ok(Json(AssignmentResponse {
        assignment_id: *assignment.assignment_id.as_uuid(),
        status: assignment.status,
    }))
}

/// One manifest row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestPassenger {
    /// Passenger identifier
    pub passenger_id: Uuid,
    /// Display name
    pub display_name: String,
    /// Their booking
    pub booking_id: Uuid,
    /// CONFIRMED or BOARDED
    pub status: BookingStatus,
    /// Human boarding state
    pub boarding_status: String,
}

/// Manifest response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResponse {
    /// The trip
    pub trip_id: Uuid,
    /// Seated passengers, ordered by name
    pub passengers: Vec<ManifestPassenger>,
    /// Row count
    pub total_count: usize,
}

/// Seated passengers of a trip.
pub async fn passenger_manifest(
    _session: OperatorSession,
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<ManifestResponse>> {
    let trip_id = TripId::from_uuid(parse_uuid(&trip_id)?);
    let rows = state.bookings.manifest_for_trip(trip_id).await?;

    let passengers: Vec<ManifestPassenger> = rows
        .into_iter()
        .map(|row| ManifestPassenger {
            passenger_id: *row.passenger_id.as_uuid(),
            display_name: row.display_name,
            booking_id: *row.booking_id.as_uuid(),
            status: row.status,
            boarding_status: boarding_status_label(row.status).to_string(),
        })
        .collect();

    Ok(Json(ManifestResponse {
        trip_id: *trip_id.as_uuid(),
        total_count: passengers.len(),
        passengers,
    }))
}

/// Misconduct report request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportRequest {
    /// Reported passenger
    pub passenger_id: Uuid,
    /// Trip on which the incident occurred
    pub trip_id: Uuid,
    /// Incident category
    pub reason: ReportReason,
    /// Details; required when reason is OTHER
    pub comments: Option<String>,
    /// Inline-encoded evidence photo
    pub image_base64: Option<String>,
}

/// Misconduct report response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReportResponse {
    /// The new report
    pub report_id: Uuid,
}

/// File a misconduct report.
pub async fn submit_report(
    session: OperatorSession,
    State(state): State<AppState>,
    Body(request): Body<SubmitReportRequest>,
) -> Result<(StatusCode, Json<SubmitReportResponse>)> {
    let report_id = state
        .evidence
        .submit_report(
            session.operator_id,
            PassengerId::from_uuid(request.passenger_id),
            TripId::from_uuid(request.trip_id),
            request.reason,
            request.comments,
            request.image_base64,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitReportResponse {
            report_id: *report_id.as_uuid(),
        }),
    ))
}

/// Position report request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpsUpdateRequest {
    /// Trip the bus is running
    pub trip_id: Uuid,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Speed in km/h; defaults to 0
    pub speed: Option<f64>,
    /// Report time; defaults to now
    pub ts: Option<DateTime<Utc>>,
}

/// Position report response.
#[derive(Debug, Serialize)]
pub struct GpsUpdateResponse {
    /// Always true on success
    pub accepted: bool,
    /// The timestamp the position was published with
    pub ts: DateTime<Utc>,
}

/// Publish a position report to the telemetry topic.
pub async fn gps_update(
    _session: OperatorSession,
    State(state): State<AppState>,
    Body(request): Body<GpsUpdateRequest>,
) -> Result<Json<GpsUpdateResponse>> {
    let position = state
        .telemetry
        .publish_position(
            TripId::from_uuid(request.trip_id),
            request.lat,
            request.lon,
            request.speed,
            request.ts,
            state.clock.now(),
        )
        .await?;

    Ok(Json(GpsUpdateResponse {
        accepted: true,
        ts: position.ts,
    }))
}

/// Operators read the manifest as boarded / not boarded.
const fn boarding_status_label(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Boarded => "Boarded",
        BookingStatus::Confirmed | BookingStatus::Waitlist | BookingStatus::Cancelled => {
            "Not Boarded"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_labels() {
        assert_eq!(boarding_status_label(BookingStatus::Boarded), "Boarded");
        assert_eq!(boarding_status_label(BookingStatus::Confirmed), "Not Boarded");
    }
}
