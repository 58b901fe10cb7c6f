//! Token laws, exercised through the public API: sign → verify → decode
//! yields the original claims for any unexpired token, and every failure
//! mode is one of the four verification errors.

use campus_bus::config::TokenConfig;
use campus_bus::token::{TokenError, TokenKind, TokenService};
use campus_bus::types::{BookingId, OperatorId, PassengerId, TripId};
use chrono::{Duration, TimeZone, Utc};

fn service() -> TokenService {
    TokenService::new(&TokenConfig {
        auth_secret: "integration-auth-secret-0123456789abcdef".to_string(),
        boarding_secret: "integration-boarding-secret-0123456789ab".to_string(),
        allowed_email_domain: "@campus.edu".to_string(),
    })
}

#[test]
fn sign_verify_decode_round_trips_all_three_kinds() {
    let tokens = service();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();

    let passenger = PassengerId::new();
    let signed = tokens.issue_passenger_session(passenger, "p@campus.edu", now);
    let claims = tokens.verify(&signed, TokenKind::Passenger, now).unwrap();
    assert_eq!(claims.subject, *passenger.as_uuid());
    assert_eq!(claims.email.as_deref(), Some("p@campus.edu"));

    let operator = OperatorId::new();
    let signed = tokens.issue_operator_session(operator, "op101", now);
    let claims = tokens.verify(&signed, TokenKind::Operator, now).unwrap();
    assert_eq!(claims.subject, *operator.as_uuid());
    assert_eq!(claims.role.as_deref(), Some("OPERATOR"));

    let booking = BookingId::new();
    let trip = TripId::new();
    let departure = now + Duration::hours(9);
    let signed = tokens.issue_boarding(booking, trip, passenger, departure, now);
    let claims = tokens.verify(&signed, TokenKind::Boarding, now).unwrap();
    assert_eq!(claims.subject, *booking.as_uuid());
    assert_eq!(claims.trip_id, Some(*trip.as_uuid()));
    assert_eq!(claims.passenger_id, Some(*passenger.as_uuid()));
}

#[test]
fn a_different_service_secret_rejects_the_signature() {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let signed = service().issue_passenger_session(PassengerId::new(), "p@campus.edu", now);

    let other = TokenService::new(&TokenConfig {
        auth_secret: "a-completely-different-secret-0123456789".to_string(),
        boarding_secret: "another-different-secret-0123456789abcd".to_string(),
        allowed_email_domain: "@campus.edu".to_string(),
    });

    assert_eq!(
        other.verify(&signed, TokenKind::Passenger, now),
        Err(TokenError::InvalidSignature)
    );
}

#[test]
fn truncated_and_empty_tokens_are_malformed() {
    let tokens = service();
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let signed = tokens.issue_passenger_session(PassengerId::new(), "p@campus.edu", now);

    let truncated = &signed[..signed.len() / 2];
    assert!(matches!(
        tokens.verify(truncated, TokenKind::Passenger, now),
        Err(TokenError::Malformed | TokenError::InvalidSignature)
    ));
    assert_eq!(
        tokens.verify("", TokenKind::Passenger, now),
        Err(TokenError::Malformed)
    );
}
