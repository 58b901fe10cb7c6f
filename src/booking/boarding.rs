//! Boarding validation.
//!
//! An operator presents a scanned boarding token for a specific trip. The
//! token is verified purely (signature, expiry, kind, trip binding) before
//! any storage is touched; the transition to BOARDED happens once, and a
//! duplicate scan reports back as an advisory instead of an error.

use super::{BookingEngine, ScanOutcome};
use crate::coord::CoordStore;
use crate::error::{Error, Result};
use crate::token::TokenKind;
use crate::types::{BookingId, BookingStatus, TripId};

impl BookingEngine {
    /// Validate a presented boarding token against a trip and mark the
    /// booking boarded.
    ///
    /// # Errors
    ///
    /// `INVALID_TOKEN` for any token verification failure, `WRONG_TRIP` if
    /// the token was minted for another trip, `CONCURRENT_SCAN` while
    /// another scan of the same booking is in flight, `NOT_FOUND` /
    /// `NOT_ELIGIBLE` for bookings that cannot board, or a storage error.
    pub async fn validate_boarding(
        &self,
        presented_token: &str,
        trip_id: TripId,
    ) -> Result<ScanOutcome> {
        let now = self.clock.now();

        let claims = self
            .tokens
            .verify(presented_token, TokenKind::Boarding, now)
            .map_err(|_| Error::InvalidToken)?;

        // Trip binding comes from the signed claims, checked before any
        // storage access.
        match claims.trip_id {
            Some(claim_trip) if claim_trip == *trip_id.as_uuid() => {}
            Some(_) => return Err(Error::WrongTrip),
            None => return Err(Error::InvalidToken),
        }
        let booking_id = BookingId::from_uuid(claims.subject);

        let Some(lease) = self
            .coord
            .try_acquire(CoordStore::scan_key(booking_id))
            .await?
        else {
            return Err(Error::ConcurrentScan);
        };

        let result = self.scan_tx(booking_id, trip_id).await;
        self.coord.release(lease).await;

        match &result {
            Ok(ScanOutcome::Boarded { passenger_id, .. }) => {
                tracing::info!(%booking_id, %trip_id, %passenger_id, "passenger boarded");
            }
            Ok(ScanOutcome::AlreadyBoarded { .. }) => {
                tracing::info!(%booking_id, %trip_id, "duplicate scan suppressed");
            }
            Err(_) => {}
        }
        result
    }

    /// The single scan transaction: load, branch on status, transition.
    async fn scan_tx(&self, booking_id: BookingId, trip_id: TripId) -> Result<ScanOutcome> {
        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;

        let booking = self
            .bookings
            .find_for_scan(&mut *tx, booking_id, trip_id)
            .await?
            .ok_or(Error::NotFound)?;

        match booking.status {
            BookingStatus::Boarded => {
                // Idempotent: never double-counts, `boarded_at` untouched.
                return Ok(ScanOutcome::AlreadyBoarded {
                    booking_id,
                    passenger_id: booking.passenger_id,
                });
            }
            BookingStatus::Confirmed => {}
            BookingStatus::Waitlist | BookingStatus::Cancelled => {
                return Err(Error::NotEligible);
            }
        }

        self.bookings.mark_boarded(&mut *tx, booking_id, now).await?;
        tx.commit().await?;

        Ok(ScanOutcome::Boarded {
            booking_id,
            passenger_id: booking.passenger_id,
        })
    }
}
