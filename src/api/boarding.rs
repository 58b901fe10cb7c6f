//! Boarding validation endpoint (operator realm).

use super::Body;
use crate::auth::OperatorSession;
use crate::booking::ScanOutcome;
use crate::error::Result;
use crate::server::state::AppState;
use crate::types::TripId;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scan request: the token read from the passenger's screen plus the trip
/// the operator is running.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateBoardingRequest {
    /// Presented boarding token
    pub boarding_token: String,
    /// Trip being boarded
    pub trip_id: Uuid,
}

/// Scan response. A duplicate scan is a 200 with `ALREADY_BOARDED`, never
/// an error and never a double count.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateBoardingResponse {
    /// Always true when the scan was accepted
    pub valid: bool,
    /// BOARDED on first scan, ALREADY_BOARDED on repeats
    pub status: String,
    /// The scanned booking
    pub booking_id: Uuid,
    /// Its owner
    pub passenger_id: Uuid,
}

/// Validate a boarding token and mark the passenger boarded.
pub async fn validate_boarding(
    _session: OperatorSession,
    State(state): State<AppState>,
    Body(request): Body<ValidateBoardingRequest>,
) -> Result<Json<ValidateBoardingResponse>> {
    let trip_id = TripId::from_uuid(request.trip_id);
    let outcome = state
        .engine
        .validate_boarding(&request.boarding_token, trip_id)
        .await?;

    let response = match outcome {
        ScanOutcome::Boarded {
            booking_id,
            passenger_id,
        } => ValidateBoardingResponse {
            valid: true,
            status: "BOARDED".to_string(),
            booking_id: *booking_id.as_uuid(),
            passenger_id: *passenger_id.as_uuid(),
        },
        ScanOutcome::AlreadyBoarded {
            booking_id,
            passenger_id,
        } => ValidateBoardingResponse {
            valid: true,
            status: "ALREADY_BOARDED".to_string(),
            booking_id: *booking_id.as_uuid(),
            passenger_id: *passenger_id.as_uuid(),
        },
    };
    Ok(Json(response))
}
