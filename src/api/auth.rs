//! Passenger authentication endpoints.
//!
//! - POST /auth/federated: exchange a validated federated identity claim
//!   for a passenger session (creates the passenger on first login)
//! - PUT /auth/complete-profile: set room and phone

use super::Body;
use crate::auth::PassengerSession;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Passenger, PassengerId};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Federated login request. The upstream identity provider has already
/// verified ownership of the email; the core only trusts the claim.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedLoginRequest {
    /// Verified email claim
    pub email: String,
    /// Display name from the identity provider
    pub display_name: String,
}

/// Federated login response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedLoginResponse {
    /// Passenger identifier
    pub passenger_id: Uuid,
    /// Passenger session token (7-day lifetime)
    pub token: String,
    /// Whether this login created the account
    pub is_new_user: bool,
    /// Whether room and phone are on file
    pub profile_complete: bool,
    /// Display name on file
    pub display_name: String,
    /// Email on file
    pub email: String,
    /// Room, empty until the profile is completed
    pub room: String,
    /// Phone, empty until the profile is completed
    pub phone: String,
}

/// Exchange a federated identity claim for a passenger session.
pub async fn federated_login(
    State(state): State<AppState>,
    Body(request): Body<FederatedLoginRequest>,
) -> Result<(StatusCode, Json<FederatedLoginResponse>)> {
    let email = request.email.trim().to_string();
    let display_name = request.display_name.trim().to_string();
    if email.is_empty() || display_name.is_empty() {
        return Err(Error::MalformedRequest);
    }

    if !email_domain_allowed(&email, &state.config.tokens.allowed_email_domain) {
        return Err(Error::DomainNotAllowed);
    }

    let now = state.clock.now();

    if let Some(passenger) = state.passengers.find_by_email(&email).await? {
        let token =
            state
                .tokens
                .issue_passenger_session(passenger.passenger_id, &passenger.email, now);
        return Ok((StatusCode::OK, Json(login_response(&passenger, token, false))));
    }

    let passenger = Passenger {
        passenger_id: PassengerId::new(),
        email: email.clone(),
        display_name,
        room: None,
        phone: None,
        penalty_count: 0,
        blocked_until: None,
        created_at: now,
    };

    if let Err(err) = state.passengers.create(&passenger).await {
        // A concurrent first login for the same email can win the insert;
        // fall back to the row it created.
        if let Some(existing) = state.passengers.find_by_email(&email).await? {
            let token =
                state
                    .tokens
                    .issue_passenger_session(existing.passenger_id, &existing.email, now);
            return Ok((StatusCode::OK, Json(login_response(&existing, token, false))));
        }
        return Err(err);
    }

    let token = state
        .tokens
        .issue_passenger_session(passenger.passenger_id, &passenger.email, now);

    tracing::info!(passenger_id = %passenger.passenger_id, "passenger created at first login");
    Ok((StatusCode::CREATED, Json(login_response(&passenger, token, true))))
}

/// Profile completion request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileRequest {
    /// Passenger the profile belongs to; must match the session
    pub passenger_id: Uuid,
    /// Dormitory room
    pub room: String,
    /// Contact phone
    pub phone: String,
}

/// Profile completion response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteProfileResponse {
    /// Always true on success
    pub profile_complete: bool,
}

/// Set the authenticated passenger's room and phone.
pub async fn complete_profile(
    session: PassengerSession,
    State(state): State<AppState>,
    Body(request): Body<CompleteProfileRequest>,
) -> Result<Json<CompleteProfileResponse>> {
    if request.passenger_id != *session.passenger_id.as_uuid() {
        return Err(Error::Forbidden);
    }

    let room = request.room.trim();
    let phone = request.phone.trim();
    if room.is_empty() || phone.is_empty() {
        return Err(Error::MalformedRequest);
    }

    state
        .passengers
        .complete_profile(session.passenger_id, room, phone)
        .await?;

    Ok(Json(CompleteProfileResponse {
        profile_complete: true,
    }))
}

fn login_response(passenger: &Passenger, token: String, is_new_user: bool) -> FederatedLoginResponse {
    FederatedLoginResponse {
        passenger_id: *passenger.passenger_id.as_uuid(),
        token,
        is_new_user,
        profile_complete: passenger.profile_complete(),
        display_name: passenger.display_name.clone(),
        email: passenger.email.clone(),
        room: passenger.room.clone().unwrap_or_default(),
        phone: passenger.phone.clone().unwrap_or_default(),
    }
}

/// Case-insensitive suffix match against the configured domain.
fn email_domain_allowed(email: &str, allowed_domain: &str) -> bool {
    email.to_lowercase().ends_with(&allowed_domain.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_check_is_a_case_insensitive_suffix_match() {
        assert!(email_domain_allowed("s1@campus.edu", "@campus.edu"));
        assert!(email_domain_allowed("S1@Campus.EDU", "@campus.edu"));
        assert!(!email_domain_allowed("s1@gmail.com", "@campus.edu"));
        assert!(!email_domain_allowed("s1@campus.edu.evil.com", "@campus.edu"));
        assert!(!email_domain_allowed("", "@campus.edu"));
    }
}
