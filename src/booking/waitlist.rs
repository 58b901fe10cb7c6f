//! Cancellation and waitlist promotion.
//!
//! Cancelling a confirmed booking frees exactly one seat, so exactly one
//! waitlisted passenger (the FIFO head) is promoted, inside the same
//! transaction rather than as a deferred event. The remaining ranks are shifted
//! down so positions stay `{1..k}` with no gaps.

use super::{BookingEngine, CancelOutcome, RETRY_BACKOFF_MS, SERIALIZATION_RETRIES};
use crate::coord::CoordStore;
use crate::error::{Error, Result};
use crate::types::{BookingId, BookingStatus, PassengerId, Trip};
use std::time::Duration;

impl BookingEngine {
    /// Cancel a booking the passenger owns, promoting the head of the
    /// waitlist if a confirmed seat was freed.
    ///
    /// Cancelling an already-cancelled booking is an idempotent success;
    /// a boarded booking can no longer be cancelled.
    ///
    /// # Errors
    ///
    /// `NOT_FOUND`, `FORBIDDEN`, `CONCURRENT_REQUEST`, or a storage error.
    pub async fn cancel(
        &self,
        passenger_id: PassengerId,
        booking_id: BookingId,
    ) -> Result<CancelOutcome> {
        let booking = self.bookings.find(booking_id).await?.ok_or(Error::NotFound)?;
        if booking.passenger_id != passenger_id {
            return Err(Error::Forbidden);
        }
        match booking.status {
            BookingStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
            BookingStatus::Boarded => return Err(Error::Forbidden),
            BookingStatus::Confirmed | BookingStatus::Waitlist => {}
        }

        // The trip is needed for the promoted passenger's boarding token;
        // trips are immutable apart from status once booked.
        let trip = self
            .trips
            .find(booking.trip_id)
            .await?
            .ok_or(Error::NotFound)?;

        let Some(lease) = self
            .coord
            .try_acquire(CoordStore::cancel_key(booking.trip_id))
            .await?
        else {
            return Err(Error::ConcurrentRequest);
        };

        let result = self.cancel_with_retry(booking_id, &trip).await;
        self.coord.release(lease).await;

        if let Ok(CancelOutcome::Cancelled { promoted }) = &result {
            match promoted {
                Some((promoted_id, _)) => tracing::info!(
                    %booking_id,
                    trip_id = %booking.trip_id,
                    promoted = %promoted_id,
                    "booking cancelled, waitlist head promoted"
                ),
                None => tracing::info!(
                    %booking_id,
                    trip_id = %booking.trip_id,
                    "booking cancelled"
                ),
            }
        }
        result
    }

    async fn cancel_with_retry(
        &self,
        booking_id: BookingId,
        trip: &Trip,
    ) -> Result<CancelOutcome> {
        let mut attempt = 0;
        loop {
            match self.cancel_tx(booking_id, trip).await {
                Err(Error::ConcurrentRequest) if attempt < SERIALIZATION_RETRIES => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(
                        RETRY_BACKOFF_MS << (attempt - 1),
                    ))
                    .await;
                }
                other => return other,
            }
        }
    }

    /// The single cancellation transaction: cancel, promote at most one,
    /// renumber.
    async fn cancel_tx(&self, booking_id: BookingId, trip: &Trip) -> Result<CancelOutcome> {
        let now = self.clock.now();
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;

        // Re-read under the transaction; a racing cancel may have won.
        let booking = self
            .bookings
            .find_for_scan(&mut *tx, booking_id, trip.trip_id)
            .await?
            .ok_or(Error::NotFound)?;
        let prior_status = booking.status;
        match prior_status {
            BookingStatus::Cancelled => return Ok(CancelOutcome::AlreadyCancelled),
            BookingStatus::Boarded => return Err(Error::Forbidden),
            BookingStatus::Confirmed | BookingStatus::Waitlist => {}
        }

        self.bookings.cancel(&mut *tx, booking_id).await?;

        // One seat freed: promote the FIFO head, if any.
        let head = if prior_status == BookingStatus::Confirmed {
            self.bookings.waitlist_head(&mut *tx, trip.trip_id).await?
        } else {
            None
        };

        let mut promoted = None;
        if let Some(head) = &head {
            let token = self.tokens.issue_boarding(
                head.booking_id,
                trip.trip_id,
                head.passenger_id,
                trip.departure_at(),
                now,
            );
            self.bookings
                .promote(&mut *tx, head.booking_id, &token)
                .await?;
            promoted = Some((head.booking_id, head.passenger_id));
        }

        // Close the gap the promoted (or cancelled-waitlist) entry left.
        let vacated = vacated_rank(
            prior_status,
            booking.waitlist_position,
            head.as_ref().and_then(|h| h.waitlist_position),
        );
        if let Some(position) = vacated {
            self.bookings
                .shift_waitlist_after(&mut *tx, trip.trip_id, position)
                .await?;
        }

        tx.commit().await?;
        Ok(CancelOutcome::Cancelled { promoted })
    }
}

/// The rank vacated by a cancellation, if any: a waitlisted booking vacates
/// its own rank; a confirmed booking vacates the promoted head's rank.
fn vacated_rank(prior: BookingStatus, own: Option<i32>, promoted_head: Option<i32>) -> Option<i32> {
    match prior {
        BookingStatus::Waitlist => own,
        BookingStatus::Confirmed => promoted_head,
        BookingStatus::Cancelled | BookingStatus::Boarded => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waitlist_cancel_vacates_its_own_rank() {
        assert_eq!(vacated_rank(BookingStatus::Waitlist, Some(3), None), Some(3));
    }

    #[test]
    fn confirmed_cancel_vacates_the_promoted_head_rank() {
        assert_eq!(
            vacated_rank(BookingStatus::Confirmed, None, Some(1)),
            Some(1)
        );
    }

    #[test]
    fn confirmed_cancel_with_empty_waitlist_shifts_nothing() {
        assert_eq!(vacated_rank(BookingStatus::Confirmed, None, None), None);
    }

    /// Simulates the transaction's renumbering over an in-memory rank set:
    /// removing a rank and shifting everything above it must restore a dense
    /// `{1..k}` prefix in creation order.
    #[test]
    fn renumbering_keeps_ranks_dense() {
        let mut ranks = vec![1, 2, 3, 4, 5];
        let vacated = 2;
        ranks.retain(|&r| r != vacated);
        for r in &mut ranks {
            if *r > vacated {
                *r -= 1;
            }
        }
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}
