//! Signed-token service.
//!
//! Issues and verifies the three token families (passenger session,
//! operator session, boarding) as HMAC-SHA-256 signed claim sets.
//! Signing and verification are pure functions of secret, claims, and clock;
//! nothing here touches storage.
//!
//! Wire format is `base64url(claims_json) . base64url(mac)` with no padding.
//! Session tokens and boarding tokens are signed with distinct secrets so
//! that a leaked boarding key cannot mint sessions.

use crate::config::TokenConfig;
use crate::types::{BookingId, OperatorId, PassengerId, TripId};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Passenger sessions last 7 days.
pub const PASSENGER_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Operator sessions last 24 hours (shift work runs past midnight).
pub const OPERATOR_SESSION_TTL_SECS: i64 = 24 * 60 * 60;

/// Boarding tokens stay valid 24 hours past departure.
pub const BOARDING_GRACE_SECS: i64 = 24 * 60 * 60;

/// Token family discriminant, carried as a claim and checked on verify.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Passenger session token
    Passenger,
    /// Operator session token
    Operator,
    /// Single-trip boarding token
    Boarding,
}

/// Verification failures. No partial success: a token either yields its
/// claims or exactly one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// MAC does not match the payload.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token is past its expiry.
    #[error("expired")]
    Expired,
    /// Token is of a different family than the endpoint expects.
    #[error("wrong kind")]
    WrongKind,
    /// Token is not two base64url segments of valid claims JSON.
    #[error("malformed")]
    Malformed,
}

/// Signed claim set.
///
/// `subject` is the passenger, operator, or booking identifier depending on
/// `kind`; the optional fields are the per-family extras.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier (passenger, operator, or booking)
    pub subject: Uuid,
    /// Token family
    pub kind: TokenKind,
    /// Issue time, unix seconds
    pub issued_at: i64,
    /// Expiry, unix seconds
    pub expires_at: i64,
    /// Passenger email (passenger sessions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Employee ID (operator sessions)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<String>,
    /// Role claim (operator sessions carry "OPERATOR")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Trip the boarding token is bound to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<Uuid>,
    /// Passenger the boarding token belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger_id: Option<Uuid>,
}

/// Issues and verifies all three token families.
#[derive(Clone)]
pub struct TokenService {
    auth_secret: Vec<u8>,
    boarding_secret: Vec<u8>,
}

impl TokenService {
    /// Build the service from configured secrets.
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            auth_secret: config.auth_secret.as_bytes().to_vec(),
            boarding_secret: config.boarding_secret.as_bytes().to_vec(),
        }
    }

    fn secret_for(&self, kind: TokenKind) -> &[u8] {
        match kind {
            TokenKind::Passenger | TokenKind::Operator => &self.auth_secret,
            TokenKind::Boarding => &self.boarding_secret,
        }
    }

    /// Mint a passenger session token.
    #[must_use]
    pub fn issue_passenger_session(
        &self,
        passenger_id: PassengerId,
        email: &str,
        now: DateTime<Utc>,
    ) -> String {
        self.sign(&Claims {
            subject: *passenger_id.as_uuid(),
            kind: TokenKind::Passenger,
            issued_at: now.timestamp(),
            expires_at: now.timestamp() + PASSENGER_SESSION_TTL_SECS,
            email: Some(email.to_string()),
            employee_id: None,
            role: None,
            trip_id: None,
            passenger_id: None,
        })
    }

    /// Mint an operator session token.
    #[must_use]
    pub fn issue_operator_session(
        &self,
        operator_id: OperatorId,
        employee_id: &str,
        now: DateTime<Utc>,
    ) -> String {
        self.sign(&Claims {
            subject: *operator_id.as_uuid(),
            kind: TokenKind::Operator,
            issued_at: now.timestamp(),
            expires_at: now.timestamp() + OPERATOR_SESSION_TTL_SECS,
            email: None,
            employee_id: Some(employee_id.to_string()),
            role: Some("OPERATOR".to_string()),
            trip_id: None,
            passenger_id: None,
        })
    }

    /// Mint a boarding token, valid until 24 hours past the trip's departure.
    #[must_use]
    pub fn issue_boarding(
        &self,
        booking_id: BookingId,
        trip_id: TripId,
        passenger_id: PassengerId,
        departure_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> String {
        self.sign(&Claims {
            subject: *booking_id.as_uuid(),
            kind: TokenKind::Boarding,
            issued_at: now.timestamp(),
            expires_at: departure_at.timestamp() + BOARDING_GRACE_SECS,
            email: None,
            employee_id: None,
            role: None,
            trip_id: Some(*trip_id.as_uuid()),
            passenger_id: Some(*passenger_id.as_uuid()),
        })
    }

    /// Verify a token against an expected family and the current time.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenError`] on signature mismatch, expiry, family
    /// mismatch, or malformed input.
    pub fn verify(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> std::result::Result<Claims, TokenError> {
        let (payload_b64, mac_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let mac_bytes = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| TokenError::Malformed)?;

        // MAC covers the encoded payload; verify_slice is constant-time.
        let mut mac = HmacSha256::new_from_slice(self.secret_for(expected))
            .map_err(|_| TokenError::InvalidSignature)?;
        mac.update(payload_b64.as_bytes());
        mac.verify_slice(&mac_bytes)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let claims: Claims =
            serde_json::from_slice(&payload).map_err(|_| TokenError::Malformed)?;

        if claims.kind != expected {
            return Err(TokenError::WrongKind);
        }
        if claims.expires_at <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    fn sign(&self, claims: &Claims) -> String {
        // Claims are plain data; serialization cannot fail.
        let payload = serde_json::to_vec(claims).unwrap_or_default();
        let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

        let mut mac = HmacSha256::new_from_slice(self.secret_for(claims.kind))
            .expect("HMAC accepts keys of any length");
        mac.update(payload_b64.as_bytes());
        let mac_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{payload_b64}.{mac_b64}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn service() -> TokenService {
        TokenService::new(&TokenConfig {
            auth_secret: "test-auth-secret-256-bits-aaaaaaaaaaaaaaaa".to_string(),
            boarding_secret: "test-boarding-secret-256-bits-bbbbbbbbbb".to_string(),
            allowed_email_domain: "@campus.edu".to_string(),
        })
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn passenger_session_round_trips() {
        let tok = service();
        let pid = PassengerId::new();
        let now = at(9);

        let signed = tok.issue_passenger_session(pid, "s1@campus.edu", now);
        let claims = tok.verify(&signed, TokenKind::Passenger, now).unwrap();

        assert_eq!(claims.subject, *pid.as_uuid());
        assert_eq!(claims.kind, TokenKind::Passenger);
        assert_eq!(claims.email.as_deref(), Some("s1@campus.edu"));
        assert_eq!(claims.expires_at - claims.issued_at, PASSENGER_SESSION_TTL_SECS);
    }

    #[test]
    fn operator_session_carries_role() {
        let tok = service();
        let oid = OperatorId::new();
        let now = at(9);

        let signed = tok.issue_operator_session(oid, "op101", now);
        let claims = tok.verify(&signed, TokenKind::Operator, now).unwrap();

        assert_eq!(claims.employee_id.as_deref(), Some("op101"));
        assert_eq!(claims.role.as_deref(), Some("OPERATOR"));
        assert_eq!(claims.expires_at - claims.issued_at, OPERATOR_SESSION_TTL_SECS);
    }

    #[test]
    fn boarding_token_expires_24h_after_departure() {
        let tok = service();
        let booking = BookingId::new();
        let trip = TripId::new();
        let passenger = PassengerId::new();
        let departure = at(18);

        let signed = tok.issue_boarding(booking, trip, passenger, departure, at(9));

        // Still valid just before the grace window closes.
        let claims = tok
            .verify(&signed, TokenKind::Boarding, departure + Duration::hours(23))
            .unwrap();
        assert_eq!(claims.trip_id, Some(*trip.as_uuid()));
        assert_eq!(claims.passenger_id, Some(*passenger.as_uuid()));

        // Expired once the grace window has passed.
        assert_eq!(
            tok.verify(&signed, TokenKind::Boarding, departure + Duration::hours(25)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn expired_session_is_rejected() {
        let tok = service();
        let signed = tok.issue_passenger_session(PassengerId::new(), "s1@campus.edu", at(9));
        assert_eq!(
            tok.verify(
                &signed,
                TokenKind::Passenger,
                at(9) + Duration::seconds(PASSENGER_SESSION_TTL_SECS)
            ),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let tok = service();
        let signed = tok.issue_operator_session(OperatorId::new(), "op101", at(9));
        // Operator and passenger sessions share a secret, so the MAC passes
        // and the kind claim is what stops cross-realm reuse.
        assert_eq!(
            tok.verify(&signed, TokenKind::Passenger, at(9)),
            Err(TokenError::WrongKind)
        );
    }

    #[test]
    fn boarding_and_session_secrets_are_distinct() {
        let tok = service();
        let signed = tok.issue_boarding(
            BookingId::new(),
            TripId::new(),
            PassengerId::new(),
            at(18),
            at(9),
        );
        // Verified under the session secret the MAC cannot match.
        assert_eq!(
            tok.verify(&signed, TokenKind::Operator, at(9)),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let tok = service();
        let signed = tok.issue_passenger_session(PassengerId::new(), "s1@campus.edu", at(9));
        let (payload, mac) = signed.split_once('.').unwrap();

        // Re-encode a modified payload under the original MAC.
        let mut claims: Claims =
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();
        claims.subject = Uuid::new_v4();
        let forged = format!(
            "{}.{mac}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap())
        );

        assert_eq!(
            tok.verify(&forged, TokenKind::Passenger, at(9)),
            Err(TokenError::InvalidSignature)
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let tok = service();
        assert_eq!(
            tok.verify("not-a-token", TokenKind::Passenger, at(9)),
            Err(TokenError::Malformed)
        );
        assert_eq!(
            tok.verify("a.b.c!!", TokenKind::Passenger, at(9)),
            Err(TokenError::Malformed)
        );
    }
}
